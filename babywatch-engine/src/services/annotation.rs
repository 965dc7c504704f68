//! Skeleton overlay for annotated snapshots

use image::{Rgb, RgbImage};

use crate::models::{LandmarkSet, POSE_CONNECTIONS};

const JOINT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BONE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const JOINT_RADIUS: i32 = 4;
const BONE_THICKNESS: i32 = 2;

/// Draw visible joints and the segments between them on a copy of `image`
///
/// Landmarks are normalized image coordinates; points outside the frame are
/// clipped.
pub fn annotate_frame(image: &RgbImage, landmarks: &LandmarkSet, visibility_threshold: f32) -> RgbImage {
    let mut annotated = image.clone();
    if landmarks.is_empty() {
        return annotated;
    }

    let (width, height) = (image.width() as f32, image.height() as f32);
    let to_pixel = |x: f32, y: f32| ((x * width) as i32, (y * height) as i32);

    for (start, end) in POSE_CONNECTIONS.iter() {
        let (Some(a), Some(b)) = (landmarks.get(*start), landmarks.get(*end)) else {
            continue;
        };
        if a.is_visible(visibility_threshold) && b.is_visible(visibility_threshold) {
            draw_line(&mut annotated, to_pixel(a.x, a.y), to_pixel(b.x, b.y), BONE_COLOR);
        }
    }

    for point in landmarks.points() {
        if point.is_visible(visibility_threshold) {
            draw_disc(&mut annotated, to_pixel(point.x, point.y), JOINT_RADIUS, JOINT_COLOR);
        }
    }

    annotated
}

fn put_pixel_clipped(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_disc(image: &mut RgbImage, center: (i32, i32), radius: i32, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_clipped(image, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}

/// Bresenham line with a square brush
fn draw_line(image: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    let half = BONE_THICKNESS / 2;

    loop {
        for oy in -half..=half {
            for ox in -half..=half {
                put_pixel_clipped(image, x + ox, y + oy, color);
            }
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
