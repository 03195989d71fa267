use crate::color::Color;
use crate::error::ClusterError;
use crate::icon::{BadgeImage, SizeBucket};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

/// Appearance of a default cluster badge: a filled circle with an outline and the size label in
/// the middle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadgeStyle {
    /// Circle fill color.
    pub fill: Color,
    /// Outline color.
    pub outline: Color,
    /// Label color.
    pub text: Color,
    /// Diameter of the badge in pixels.
    pub diameter: u32,
    /// Width of the outline in pixels.
    pub outline_width: f32,
}

impl Default for BadgeStyle {
    fn default() -> Self {
        Self {
            fill: Color::GRAY,
            outline: Color::WHITE.with_alpha(200),
            text: Color::WHITE,
            diameter: 40,
            outline_width: 3.0,
        }
    }
}

impl BadgeStyle {
    /// Style for the given bucket: the hue moves from blue to red as clusters grow, and the
    /// badge gets larger for longer labels.
    pub fn for_bucket(bucket: SizeBucket) -> Self {
        let k = bucket.value().min(300) as f32 / 300.0;
        let hue = (1.0 - k) * (1.0 - k) * 220.0;
        let label_len = bucket.label().len() as u32;

        Self {
            fill: Color::from_hsv(hue, 0.75, 0.85),
            diameter: 36 + 6 * label_len.saturating_sub(1),
            ..Default::default()
        }
    }
}

/// Draws a badge with the bucket label.
pub fn draw_badge(bucket: SizeBucket, style: &BadgeStyle) -> Result<BadgeImage, ClusterError> {
    if style.diameter < GLYPH_HEIGHT + 2 {
        return Err(ClusterError::Render(format!(
            "badge diameter {} is too small",
            style.diameter
        )));
    }

    let size = style.diameter;
    let radius = size as f32 / 2.0;
    let inner_radius = (radius - style.outline_width).max(0.0);

    let mut canvas = RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - radius;
        let dy = y as f32 + 0.5 - radius;
        let distance = (dx * dx + dy * dy).sqrt();

        let color = if distance <= inner_radius {
            style.fill
        } else if distance <= radius {
            style.fill.blend(style.outline)
        } else {
            Color::TRANSPARENT
        };

        Rgba(color.to_u8_array())
    });

    draw_label(&mut canvas, &bucket.label(), style);

    let (width, height) = canvas.dimensions();
    BadgeImage::from_rgba(canvas.into_raw(), width, height)
}

fn draw_label(canvas: &mut RgbaImage, label: &str, style: &BadgeStyle) {
    let glyphs: Vec<_> = label.chars().filter_map(glyph).collect();
    if glyphs.is_empty() {
        return;
    }

    let count = glyphs.len() as u32;
    let unscaled_width = count * GLYPH_WIDTH + (count - 1);
    let max_width = style.diameter * 7 / 10;
    let scale = (style.diameter * 2 / 5 / GLYPH_HEIGHT)
        .min(max_width / unscaled_width)
        .max(1);

    let text_width = unscaled_width * scale;
    let text_height = GLYPH_HEIGHT * scale;
    let left = style.diameter.saturating_sub(text_width) / 2;
    let top = style.diameter.saturating_sub(text_height) / 2;
    let color = Rgba(style.text.to_u8_array());

    for (index, rows) in glyphs.iter().enumerate() {
        let glyph_left = left + index as u32 * (GLYPH_WIDTH + 1) * scale;
        for (row, bits) in rows.iter().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if bits & (0b100 >> column) == 0 {
                    continue;
                }

                for sy in 0..scale {
                    for sx in 0..scale {
                        let x = glyph_left + column * scale + sx;
                        let y = top + row as u32 * scale + sy;
                        if x < canvas.width() && y < canvas.height() {
                            canvas.put_pixel(x, y, color);
                        }
                    }
                }
            }
        }
    }
}

/// 3x5 bitmap of a label character, one row per element, most significant bit on the left.
fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        _ => return None,
    };

    Some(rows)
}
