// CPU fallback painter for hosts without a usable GPU
// Draws a single centred line of text into a 0RGB pixel buffer

use super::components::Color;

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// 5x7 bitmap rows, bit 4 is the leftmost column.
fn glyph(c: char) -> [u8; 7] {
    match c {
        '3' => [0x0E, 0x11, 0x01, 0x06, 0x01, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x13, 0x0D],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'g' => [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'i' => [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'o' => [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E],
        'p' => [0x00, 0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0F, 0x10, 0x0E, 0x01, 0x1E],
        't' => [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06],
        'u' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D],
        _ => [0; 7],
    }
}

/// Pack a color as `0x00RRGGBB`, the layout softbuffer presents.
pub fn pack_rgb(color: Color) -> u32 {
    let [r, g, b, _] = color.to_rgba8(1.0);
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Fill `buffer` with `bg` and draw `message` centred in `fg`.
///
/// The glyph scale is the largest integer that keeps the line within 80% of
/// the width and 20% of the height. A buffer shorter than `width * height`
/// is painted as far as it goes.
pub fn paint_message(buffer: &mut [u32], width: u32, height: u32, message: &str, fg: Color, bg: Color) {
    buffer.fill(pack_rgb(bg));
    if width == 0 || height == 0 || message.is_empty() {
        return;
    }

    let chars: Vec<char> = message.chars().collect();
    let columns = chars.len() as u32 * (GLYPH_W + 1) - 1;
    let scale = ((width * 4 / 5) / columns).min((height / 5) / GLYPH_H).max(1);

    let text_w = columns * scale;
    let text_h = GLYPH_H * scale;
    let left = width.saturating_sub(text_w) / 2;
    let top = height.saturating_sub(text_h) / 2;
    let ink = pack_rgb(fg);

    for (i, c) in chars.iter().enumerate() {
        let origin_x = left + i as u32 * (GLYPH_W + 1) * scale;
        for (row, bits) in glyph(*c).iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let x0 = origin_x + col * scale;
                let y0 = top + row as u32 * scale;
                for y in y0..(y0 + scale).min(height) {
                    for x in x0..(x0 + scale).min(width) {
                        if let Some(px) = buffer.get_mut((y * width + x) as usize) {
                            *px = ink;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

    #[test]
    fn pack_rgb_orders_channels() {
        assert_eq!(pack_rgb(Color { r: 1.0, g: 0.0, b: 0.0 }), 0x00FF_0000);
        assert_eq!(pack_rgb(Color::from_hex("#0a0a12").unwrap()), 0x000A_0A12);
    }

    #[test]
    fn message_is_drawn_centred() {
        let (w, h) = (400u32, 200u32);
        let mut buffer = vec![0u32; (w * h) as usize];
        paint_message(&mut buffer, w, h, "3D rendering not supported", Color::WHITE, BG);

        let ink: Vec<(u32, u32)> = buffer
            .iter()
            .enumerate()
            .filter(|(_, px)| **px == 0x00FF_FFFF)
            .map(|(i, _)| (i as u32 % w, i as u32 / w))
            .collect();
        assert!(!ink.is_empty());

        let min_x = ink.iter().map(|p| p.0).min().unwrap();
        let max_x = ink.iter().map(|p| p.0).max().unwrap();
        let min_y = ink.iter().map(|p| p.1).min().unwrap();
        let max_y = ink.iter().map(|p| p.1).max().unwrap();
        assert!(min_x > 0 && max_x < w - 1);
        assert!(min_y > 0 && max_y < h - 1);
        let mid_x = (min_x + max_x) / 2;
        let mid_y = (min_y + max_y) / 2;
        assert!(mid_x.abs_diff(w / 2) <= 3, "text centred at x={mid_x}");
        assert!(mid_y.abs_diff(h / 2) <= 3, "text centred at y={mid_y}");
    }

    #[test]
    fn unknown_characters_leave_background() {
        let mut buffer = vec![0u32; 64 * 32];
        paint_message(&mut buffer, 64, 32, "??", Color::WHITE, Color::WHITE);
        assert!(buffer.iter().all(|px| *px == 0x00FF_FFFF));

        paint_message(&mut buffer, 64, 32, "##", Color::WHITE, BG);
        assert!(buffer.iter().all(|px| *px == 0));
    }

    #[test]
    fn short_buffer_does_not_panic() {
        let mut buffer = vec![0u32; 10];
        paint_message(&mut buffer, 640, 480, "3D", Color::WHITE, BG);
        paint_message(&mut [], 640, 480, "3D", Color::WHITE, BG);
        paint_message(&mut buffer, 0, 0, "3D", Color::WHITE, BG);
    }
}
