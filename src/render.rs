//! Frame annotation.
//!
//! Draws state-colored bounding boxes and identity labels straight into an
//! RGB8 buffer, plus a corner line with the tracked-arm count. The input
//! frame is never touched; annotation happens on a fresh copy.
//!
//! Box colors follow the activity states: Active green, Idle yellow,
//! Stopped red.

use std::time::Instant;

use crate::frame::Frame;
use crate::track::{ActivityState, Track};

pub const COLOR_ACTIVE: (u8, u8, u8) = (0, 220, 60);
pub const COLOR_IDLE: (u8, u8, u8) = (240, 200, 0);
pub const COLOR_STOPPED: (u8, u8, u8) = (230, 30, 30);
const COLOR_LABEL_TEXT: (u8, u8, u8) = (0, 0, 0);
const COLOR_STATUS_TEXT: (u8, u8, u8) = (0, 220, 60);
const COLOR_STATUS_BG: (u8, u8, u8) = (0, 0, 0);

const BOX_THICKNESS: u32 = 4;
const GLYPH_WIDTH: u32 = 8;
const GLYPH_HEIGHT: u32 = 12;

pub fn state_color(state: ActivityState) -> (u8, u8, u8) {
    match state {
        ActivityState::Active => COLOR_ACTIVE,
        ActivityState::Idle => COLOR_IDLE,
        ActivityState::Stopped => COLOR_STOPPED,
    }
}

/// Label text for a track: Active plain, still states with the elapsed
/// still time in whole seconds.
fn status_text(track: &Track, now: Instant) -> String {
    match track.state {
        ActivityState::Active => format!("ID {}: {}", track.id, track.state.label()),
        ActivityState::Idle | ActivityState::Stopped => format!(
            "ID {}: {} ({}s)",
            track.id,
            track.state.label(),
            track.stalled_for(now).as_secs()
        ),
    }
}

/// Produce an annotated copy of `frame`.
pub fn annotate(frame: &Frame, tracks: &[Track], now: Instant) -> Frame {
    let width = frame.width();
    let height = frame.height();
    let mut canvas = frame.clone().into_data();

    for track in tracks {
        let color = state_color(track.state);
        let x1 = clamp_coord(track.bbox.x1, width);
        let y1 = clamp_coord(track.bbox.y1, height);
        let x2 = clamp_coord(track.bbox.x2, width);
        let y2 = clamp_coord(track.bbox.y2, height);
        if x1 >= x2 || y1 >= y2 {
            continue;
        }
        draw_box_outline(&mut canvas, width, height, x1, y1, x2, y2, BOX_THICKNESS, color);

        let label = status_text(track, now);
        let label_w = label.chars().count() as u32 * GLYPH_WIDTH + 4;
        let label_h = GLYPH_HEIGHT + 4;
        let label_y = y1.saturating_sub(label_h);
        fill_rect(
            &mut canvas,
            width,
            height,
            x1,
            label_y,
            label_w,
            label_h,
            color,
        );
        draw_text(
            &mut canvas,
            width,
            height,
            &label,
            x1 + 2,
            label_y + 2,
            COLOR_LABEL_TEXT,
        );
    }

    let status = format!("Arms: {}", tracks.len());
    let status_w = status.chars().count() as u32 * GLYPH_WIDTH + 8;
    fill_rect(
        &mut canvas,
        width,
        height,
        8,
        8,
        status_w,
        GLYPH_HEIGHT + 8,
        COLOR_STATUS_BG,
    );
    draw_text(&mut canvas, width, height, &status, 12, 12, COLOR_STATUS_TEXT);

    // The canvas was cloned from a valid frame and only written in place.
    Frame::new(width, height, canvas).unwrap_or_else(|_| frame.clone())
}

fn clamp_coord(value: f32, limit: u32) -> u32 {
    if value <= 0.0 {
        0
    } else {
        (value.round() as u32).min(limit)
    }
}

fn set_pixel(canvas: &mut [u8], width: u32, x: u32, y: u32, color: (u8, u8, u8)) {
    let idx = (y as usize * width as usize + x as usize) * 3;
    canvas[idx] = color.0;
    canvas[idx + 1] = color.1;
    canvas[idx + 2] = color.2;
}

fn fill_rect(
    canvas: &mut [u8],
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    color: (u8, u8, u8),
) {
    let x_end = (x + w).min(width);
    let y_end = (y + h).min(height);
    for row in y..y_end {
        for col in x..x_end {
            set_pixel(canvas, width, col, row, color);
        }
    }
}

fn draw_box_outline(
    canvas: &mut [u8],
    width: u32,
    height: u32,
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    thickness: u32,
    color: (u8, u8, u8),
) {
    let w = x2 - x1;
    let h = y2 - y1;
    let t = thickness.min(w).min(h);
    // Top, bottom, left, right bars.
    fill_rect(canvas, width, height, x1, y1, w, t, color);
    fill_rect(canvas, width, height, x1, y2 - t, w, t, color);
    fill_rect(canvas, width, height, x1, y1, t, h, color);
    fill_rect(canvas, width, height, x2 - t, y1, t, h, color);
}

fn draw_text(
    canvas: &mut [u8],
    width: u32,
    height: u32,
    text: &str,
    start_x: u32,
    start_y: u32,
    color: (u8, u8, u8),
) {
    let mut x = start_x;
    for ch in text.chars() {
        if x + GLYPH_WIDTH > width {
            break;
        }
        if let Some(pattern) = glyph(ch) {
            for (row, bits) in pattern.iter().enumerate() {
                let y = start_y + row as u32;
                if y >= height {
                    break;
                }
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (7 - col)) & 1 == 1 {
                        set_pixel(canvas, width, x + col, y, color);
                    }
                }
            }
        }
        x += GLYPH_WIDTH;
    }
}

/// 8x12 bitmap glyphs for the characters the labels can produce.
fn glyph(ch: char) -> Option<[u8; 12]> {
    let pattern = match ch {
        '0' => [0x00, 0x3C, 0x42, 0x46, 0x4A, 0x52, 0x62, 0x42, 0x42, 0x3C, 0x00, 0x00],
        '1' => [0x00, 0x08, 0x18, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, 0x00],
        '2' => [0x00, 0x3C, 0x42, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x7E, 0x00, 0x00],
        '3' => [0x00, 0x3C, 0x42, 0x02, 0x1C, 0x02, 0x02, 0x02, 0x42, 0x3C, 0x00, 0x00],
        '4' => [0x00, 0x04, 0x0C, 0x14, 0x24, 0x44, 0x7E, 0x04, 0x04, 0x04, 0x00, 0x00],
        '5' => [0x00, 0x7E, 0x40, 0x40, 0x7C, 0x02, 0x02, 0x02, 0x42, 0x3C, 0x00, 0x00],
        '6' => [0x00, 0x1C, 0x20, 0x40, 0x7C, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00, 0x00],
        '7' => [0x00, 0x7E, 0x02, 0x04, 0x08, 0x08, 0x10, 0x10, 0x20, 0x20, 0x00, 0x00],
        '8' => [0x00, 0x3C, 0x42, 0x42, 0x3C, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00, 0x00],
        '9' => [0x00, 0x3C, 0x42, 0x42, 0x42, 0x3E, 0x02, 0x04, 0x08, 0x70, 0x00, 0x00],
        'A' => [0x00, 0x18, 0x24, 0x42, 0x42, 0x7E, 0x42, 0x42, 0x42, 0x42, 0x00, 0x00],
        'D' => [0x00, 0x78, 0x44, 0x42, 0x42, 0x42, 0x42, 0x42, 0x44, 0x78, 0x00, 0x00],
        'E' => [0x00, 0x7E, 0x40, 0x40, 0x40, 0x7C, 0x40, 0x40, 0x40, 0x7E, 0x00, 0x00],
        'I' => [0x00, 0x3E, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, 0x00],
        'O' => [0x00, 0x3C, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00, 0x00],
        'P' => [0x00, 0x7C, 0x42, 0x42, 0x42, 0x7C, 0x40, 0x40, 0x40, 0x40, 0x00, 0x00],
        'S' => [0x00, 0x3C, 0x42, 0x40, 0x30, 0x0C, 0x02, 0x42, 0x42, 0x3C, 0x00, 0x00],
        'T' => [0x00, 0x7F, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x00, 0x00],
        'c' => [0x00, 0x00, 0x00, 0x3C, 0x42, 0x40, 0x40, 0x40, 0x42, 0x3C, 0x00, 0x00],
        'd' => [0x00, 0x02, 0x02, 0x3A, 0x46, 0x42, 0x42, 0x42, 0x46, 0x3A, 0x00, 0x00],
        'e' => [0x00, 0x00, 0x00, 0x3C, 0x42, 0x7E, 0x40, 0x40, 0x42, 0x3C, 0x00, 0x00],
        'i' => [0x00, 0x08, 0x00, 0x18, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, 0x00],
        'l' => [0x00, 0x18, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, 0x00],
        'm' => [0x00, 0x00, 0x00, 0x76, 0x49, 0x49, 0x49, 0x49, 0x49, 0x49, 0x00, 0x00],
        'r' => [0x00, 0x00, 0x00, 0x5C, 0x62, 0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x00],
        's' => [0x00, 0x00, 0x00, 0x3E, 0x40, 0x3C, 0x02, 0x02, 0x42, 0x3C, 0x00, 0x00],
        't' => [0x00, 0x10, 0x10, 0x7C, 0x10, 0x10, 0x10, 0x10, 0x10, 0x0C, 0x00, 0x00],
        'v' => [0x00, 0x00, 0x00, 0x42, 0x42, 0x42, 0x24, 0x24, 0x18, 0x18, 0x00, 0x00],
        ':' => [0x00, 0x00, 0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x00, 0x00, 0x00],
        '(' => [0x00, 0x04, 0x08, 0x10, 0x10, 0x10, 0x10, 0x10, 0x08, 0x04, 0x00, 0x00],
        ')' => [0x00, 0x20, 0x10, 0x08, 0x08, 0x08, 0x08, 0x08, 0x10, 0x20, 0x00, 0x00],
        ' ' => [0x00; 12],
        _ => return None,
    };
    Some(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use std::time::Duration;

    fn dark_frame(width: u32, height: u32) -> Frame {
        Frame::new(width, height, vec![10u8; (width * height * 3) as usize]).unwrap()
    }

    fn track(id: u64, bbox: BoundingBox, state: ActivityState, now: Instant) -> Track {
        Track {
            id,
            class_id: 0,
            bbox,
            last_center: bbox.center(),
            last_move_at: now - Duration::from_secs(2),
            state,
            misses: 0,
        }
    }

    #[test]
    fn input_frame_is_untouched() {
        let frame = dark_frame(160, 120);
        let before = frame.data().to_vec();
        let now = Instant::now();
        let tracks = vec![track(
            1,
            BoundingBox::new(40.0, 40.0, 100.0, 100.0),
            ActivityState::Active,
            now,
        )];

        let annotated = annotate(&frame, &tracks, now);
        assert_eq!(frame.data(), before.as_slice());
        assert_ne!(annotated.data(), before.as_slice());
    }

    #[test]
    fn box_edge_carries_the_state_color() {
        let frame = dark_frame(160, 120);
        let now = Instant::now();
        let tracks = vec![track(
            1,
            BoundingBox::new(40.0, 40.0, 100.0, 100.0),
            ActivityState::Stopped,
            now,
        )];

        let annotated = annotate(&frame, &tracks, now);
        // A pixel on the top edge of the box.
        let idx = (41 * 160 + 60) * 3;
        let pixel = (
            annotated.data()[idx],
            annotated.data()[idx + 1],
            annotated.data()[idx + 2],
        );
        assert_eq!(pixel, COLOR_STOPPED);
    }

    #[test]
    fn out_of_bounds_boxes_are_clamped_without_panic() {
        let frame = dark_frame(80, 60);
        let now = Instant::now();
        let tracks = vec![
            track(
                1,
                BoundingBox::new(-20.0, -20.0, 300.0, 300.0),
                ActivityState::Idle,
                now,
            ),
            track(
                2,
                BoundingBox::new(200.0, 200.0, 300.0, 300.0),
                ActivityState::Active,
                now,
            ),
        ];

        let annotated = annotate(&frame, &tracks, now);
        assert_eq!(annotated.width(), 80);
        assert_eq!(annotated.height(), 60);
    }

    #[test]
    fn status_text_includes_stall_seconds() {
        let now = Instant::now();
        let mut t = track(
            7,
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            ActivityState::Stopped,
            now,
        );
        t.last_move_at = now - Duration::from_secs(7);
        assert_eq!(status_text(&t, now), "ID 7: STOPPED (7s)");

        t.state = ActivityState::Active;
        assert_eq!(status_text(&t, now), "ID 7: Active");
    }
}
