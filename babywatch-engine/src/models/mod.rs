// Data models shared by the analyzers and the session

pub mod event;
pub mod landmark;
pub mod media;
pub mod observation;

pub use event::*;
pub use landmark::*;
pub use media::*;
pub use observation::*;
