//! Software drawing into an RGBA frame buffer.

use crate::game::Snapshot;
use crate::pos::Pos;

pub type Rgba = (u8, u8, u8, u8);

const BACKGROUND: Rgba = (0, 0, 0, 255);
const HEAD: Rgba = (213, 50, 80, 255);
const BODY: Rgba = (255, 255, 255, 255);
const FOOD: Rgba = (0, 255, 0, 255);
const TEXT: Rgba = (255, 255, 255, 255);
const HUD: Rgba = (50, 153, 213, 255);

pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    /// `frame` must hold `width * height` RGBA pixels.
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        debug_assert_eq!(frame.len(), (width * height * 4) as usize);
        Self { frame, width, height }
    }

    pub fn clear(&mut self, (r, g, b, a): Rgba) {
        for px in self.frame.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, a]);
        }
    }

    pub fn blend_pixel(&mut self, x: i32, y: i32, (r, g, b, a): Rgba) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        let Some(px) = self.frame.get_mut(idx..idx + 4) else { return };
        let (a, ia) = (u16::from(a), u16::from(255 - a));
        for (dst, src) in px.iter_mut().zip([r, g, b]) {
            *dst = ((u16::from(src) * a + u16::from(*dst) * ia) / 255) as u8;
        }
        px[3] = 255;
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, col: Rgba) {
        let (x0, y0) = (x.max(0), y.max(0));
        let x1 = (x + w).min(self.width as i32);
        let y1 = (y + h).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, col);
            }
        }
    }

    pub fn fill_cell(&mut self, p: Pos, cell: i32, col: Rgba) {
        self.fill_rect(p.x, p.y, cell, cell, col);
    }

    /// 5x7 bitmap text; returns the x coordinate after the last glyph.
    pub fn text(&mut self, text: &str, x: i32, y: i32, scale: i32, col: Rgba) -> i32 {
        let mut cx = x;
        for ch in text.chars() {
            if let Some(rows) = glyph(ch) {
                for (ry, row) in rows.iter().enumerate() {
                    for rx in 0..5 {
                        if (row >> (4 - rx)) & 1 == 1 {
                            let (px, py) = (cx + rx * scale, y + ry as i32 * scale);
                            self.fill_rect(px, py, scale, scale, col);
                        }
                    }
                }
            }
            cx += 6 * scale;
        }
        cx
    }
}

/// Score line shown in the window's corner.
pub struct Hud {
    pub episode: u64,
    pub best: usize,
    pub epsilon: f64,
}

pub fn render(canvas: &mut Canvas<'_>, world: &Snapshot<'_>, cell: i32, hud: &Hud) {
    canvas.clear(BACKGROUND);
    canvas.fill_cell(world.food, cell, FOOD);
    let last = world.snake.len().saturating_sub(1);
    for (i, &p) in world.snake.iter().enumerate() {
        canvas.fill_cell(p, cell, if i == last { HEAD } else { BODY });
    }
    canvas.text(&format!("SCORE: {}", world.score), 10, 10, 3, TEXT);
    canvas.text(
        &format!("EPISODE: {}  BEST: {}  EPS: {:.3}", hud.episode, hud.best, hud.epsilon),
        10,
        40,
        2,
        HUD,
    );
}

fn glyph(ch: char) -> Option<[u8; 7]> {
    Some(match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b11110, 0b10001, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111],
        'I' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        _ => return None,
    })
}
