//! Timestamp overlay rendering.
//!
//! Text is drawn with a built-in 5x7 bitmap font covering the characters
//! a `YYYY-MM-DD HH:MM:SS` label needs. Characters outside that set
//! advance the cursor without drawing.

use image::{Rgb, RgbImage};

const GLYPH_WIDTH: i64 = 5;
const GLYPH_HEIGHT: i64 = 7;
/// Horizontal advance per character, in font cells.
const ADVANCE: i64 = GLYPH_WIDTH + 1;

/// Overlay placement and style.
#[derive(Debug, Clone, Copy)]
pub struct LabelStyle {
    /// Left edge of the first glyph, in pixels.
    pub left: i64,
    /// Gap between the glyph baseline and the bottom edge, in pixels.
    pub bottom_margin: i64,
    /// Pixel size of one font cell.
    pub scale: i64,
    pub color: Rgb<u8>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            left: 10,
            bottom_margin: 10,
            scale: 2,
            color: Rgb([255, 255, 0]),
        }
    }
}

/// Row bitmaps, most significant of the low five bits is the leftmost column.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        _ => return None,
    };
    Some(rows)
}

/// Draws `text` near the bottom-left corner of `frame`.
///
/// Anything falling outside the frame is clipped.
pub fn draw_label(frame: &mut RgbImage, text: &str, style: &LabelStyle) {
    let (width, height) = (frame.width() as i64, frame.height() as i64);
    let top = height - style.bottom_margin - GLYPH_HEIGHT * style.scale;

    for (index, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let origin_x = style.left + index as i64 * ADVANCE * style.scale;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let cell_x = origin_x + col * style.scale;
                let cell_y = top + row as i64 * style.scale;
                for dy in 0..style.scale {
                    for dx in 0..style.scale {
                        let (x, y) = (cell_x + dx, cell_y + dy);
                        if (0..width).contains(&x) && (0..height).contains(&y) {
                            frame.put_pixel(x as u32, y as u32, style.color);
                        }
                    }
                }
            }
        }
    }
}

/// Returns the pixel width `text` occupies with `style`.
#[cfg(test)]
fn label_width(text: &str, style: &LabelStyle) -> i64 {
    let chars = text.chars().count() as i64;
    if chars == 0 {
        return 0;
    }
    (chars * ADVANCE - 1) * style.scale
}
