//! Terminal output: a fixed 640x480 drawing surface, downsampled into a
//! braille 2x4 subpixel grid and presented with diffed cell updates.

use crate::config::{SURFACE_H, SURFACE_W};
use crate::heart::Drawable;
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

pub(crate) const HEART_COLOR: Rgb = Rgb {
    r: 0xf7,
    g: 0x60,
    b: 0x70,
};
pub(crate) const BG_COLOR: Rgb = Rgb { r: 8, g: 4, b: 6 };

fn clamp01(x: f32) -> f32 {
    x.max(0.0).min(1.0)
}

pub(crate) fn mix(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = clamp01(t);
    let u = 1.0 - t;
    Rgb {
        r: (a.r as f32 * u + b.r as f32 * t) as u8,
        g: (a.g as f32 * u + b.g as f32 * t) as u8,
        b: (a.b as f32 * u + b.b as f32 * t) as u8,
    }
}

pub(crate) fn to_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Cell {
    pub(crate) fn blank(bg: Color) -> Self {
        Self { ch: ' ', fg: bg, bg }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::blank(Color::Black); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub(crate) fn clear(&mut self, bg: Color) {
        self.cells.fill(Cell::blank(bg));
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: i32, y: i32, s: &str, fg: Color, bg: Color) {
    if y < 0 {
        return;
    }
    for (i, ch) in s.chars().enumerate() {
        let xx = x + i as i32;
        if xx >= 0 {
            buf.set(xx as u16, y as u16, Cell { ch, fg, bg });
        }
    }
}

/* -----------------------------
   The drawing surface
------------------------------ */

/// Fixed-size logical surface the drawables are painted onto. One hit count
/// per pixel; the terminal view downsamples it every repaint.
pub(crate) struct Surface {
    pub(crate) w: i32,
    pub(crate) h: i32,
    pub(crate) hits: Vec<u8>,
}

impl Surface {
    pub(crate) fn new() -> Self {
        Self {
            w: SURFACE_W,
            h: SURFACE_H,
            hits: vec![0; (SURFACE_W as usize) * (SURFACE_H as usize)],
        }
    }

    pub(crate) fn clear(&mut self) {
        self.hits.fill(0);
    }

    /// Paint one filled square, clipped to the surface.
    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, size: i32) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + size).min(self.w);
        let y1 = (y + size).min(self.h);
        for yy in y0..y1 {
            let row = (yy * self.w) as usize;
            for xx in x0..x1 {
                let i = row + xx as usize;
                self.hits[i] = self.hits[i].saturating_add(1);
            }
        }
    }

    /// Clear, then paint a whole frame record.
    pub(crate) fn paint(&mut self, drawables: &[Drawable]) {
        self.clear();
        for d in drawables {
            self.fill_rect(d.x, d.y, d.size);
        }
    }
}

/* -----------------------------
   Braille view of the surface
------------------------------ */

// Dot mapping:
// (0,0)=1 (0,1)=2 (0,2)=4 (0,3)=64
// (1,0)=8 (1,1)=16 (1,2)=32 (1,3)=128
fn braille_bit(dx: i32, dy: i32) -> u8 {
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

/// Centered viewport in braille-dot space, square-scaled by the limiting
/// axis so the surface keeps its aspect in any terminal.
pub(crate) struct Viewport {
    pub(crate) x0: i32,
    pub(crate) y0: i32,
    pub(crate) w: i32,
    pub(crate) h: i32,
}

pub(crate) fn fit_viewport(cols: u16, rows: u16) -> Viewport {
    let dot_w = cols as i32 * 2;
    let dot_h = rows as i32 * 4;
    let scale = (dot_w as f32 / SURFACE_W as f32).min(dot_h as f32 / SURFACE_H as f32);
    let w = ((SURFACE_W as f32 * scale) as i32).max(1);
    let h = ((SURFACE_H as f32 * scale) as i32).max(1);
    Viewport {
        x0: (dot_w - w) / 2,
        y0: (dot_h - h) / 2,
        w,
        h,
    }
}

/// Downsample the surface into braille cells. A dot lights when any surface
/// pixel in its footprint was painted; the cell color scales with coverage.
pub(crate) fn surface_to_cells(
    surface: &Surface,
    out: &mut CellBuffer,
    vp: &Viewport,
    color: Rgb,
    bg: Rgb,
) {
    let dim = mix(bg, color, 0.55);
    for cy in 0..out.h as i32 {
        for cx in 0..out.w as i32 {
            let mut mask = 0u8;
            let mut covered = 0u32;
            let mut sampled = 0u32;
            for dy in 0..4 {
                for dx in 0..2 {
                    let dot_x = cx * 2 + dx - vp.x0;
                    let dot_y = cy * 4 + dy - vp.y0;
                    if dot_x < 0 || dot_y < 0 || dot_x >= vp.w || dot_y >= vp.h {
                        continue;
                    }
                    // Surface footprint of this dot (at least one pixel).
                    let sx0 = dot_x * surface.w / vp.w;
                    let sy0 = dot_y * surface.h / vp.h;
                    let sx1 = ((dot_x + 1) * surface.w / vp.w).max(sx0 + 1).min(surface.w);
                    let sy1 = ((dot_y + 1) * surface.h / vp.h).max(sy0 + 1).min(surface.h);
                    let mut hit = 0u32;
                    for yy in sy0..sy1 {
                        let row = (yy * surface.w) as usize;
                        for xx in sx0..sx1 {
                            if surface.hits[row + xx as usize] > 0 {
                                hit += 1;
                            }
                        }
                    }
                    sampled += ((sx1 - sx0) * (sy1 - sy0)) as u32;
                    if hit > 0 {
                        mask |= braille_bit(dx, dy);
                        covered += hit;
                    }
                }
            }
            if mask == 0 {
                continue;
            }
            let a = clamp01(covered as f32 / sampled.max(1) as f32 * 6.0);
            let fg = mix(dim, color, a);
            out.set(
                cx as u16,
                cy as u16,
                Cell {
                    ch: char::from_u32(0x2800 + mask as u32).unwrap_or(' '),
                    fg: to_color(fg),
                    bg: to_color(bg),
                },
            );
        }
    }
}

/* -----------------------------
   Terminal session
------------------------------ */

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(
            self.out,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        // Force a full repaint after the buffers were rebuilt.
        execute!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }
                queue!(self.out, cursor::MoveTo(x, y))?;
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }
                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn braille_bits_are_distinct_and_cover_the_cell() {
        let mut seen = 0u8;
        for dy in 0..4 {
            for dx in 0..2 {
                let b = braille_bit(dx, dy);
                assert_ne!(b, 0);
                assert_eq!(seen & b, 0);
                seen |= b;
            }
        }
        assert_eq!(seen, 0xFF);
    }

    #[test]
    fn fill_rect_clips_to_surface() {
        let mut s = Surface::new();
        s.fill_rect(-10, -10, 3);
        assert!(s.hits.iter().all(|&h| h == 0));
        s.fill_rect(SURFACE_W - 1, SURFACE_H - 1, 3);
        assert_eq!(s.hits.iter().filter(|&&h| h > 0).count(), 1);
    }

    #[test]
    fn viewport_preserves_surface_aspect() {
        for (cols, rows) in [(80u16, 24u16), (200, 60), (40, 40)] {
            let vp = fit_viewport(cols, rows);
            assert!(vp.w > 0 && vp.h > 0);
            assert!(vp.x0 >= 0 && vp.y0 >= 0);
            assert!(vp.x0 + vp.w <= cols as i32 * 2);
            assert!(vp.y0 + vp.h <= rows as i32 * 4);
            let aspect = vp.w as f32 / vp.h as f32;
            let want = SURFACE_W as f32 / SURFACE_H as f32;
            assert!((aspect - want).abs() < 0.15, "aspect {aspect} at {cols}x{rows}");
        }
    }

    #[test]
    fn painted_surface_lights_cells_inside_the_viewport_only() {
        let mut s = Surface::new();
        s.fill_rect(0, 0, SURFACE_W.max(SURFACE_H));
        let mut buf = CellBuffer::new(80, 24);
        let vp = fit_viewport(80, 24);
        surface_to_cells(&s, &mut buf, &vp, HEART_COLOR, BG_COLOR);
        // The letterbox column outside the 4:3 viewport stays blank.
        let i = buf.idx(0, 12);
        assert_eq!(buf.cells[i].ch, ' ');
        // A center cell is fully lit.
        let i = buf.idx(40, 12);
        assert_eq!(buf.cells[i].ch, '\u{28FF}');
    }
}
