//! Character-cell canvas
//!
//! The canvas keeps two layers: a static board (tiles, captions, status
//! text) and an overlay redrawn every frame. Overlay items never overwrite a
//! board cell, so edges appear to leave and enter tiles at their borders.
//! Within the overlay, labels beat pulse heads, heads beat trails and trails
//! beat edges regardless of drawing order.

use crate::{Error, Result};
use flowpulse_core::render::{EdgeStroke, Label, Marker};
use flowpulse_core::{DrawItem, Point, Surface};

const Z_EMPTY: u8 = 0;
const Z_EDGE: u8 = 1;
const Z_TRAIL: u8 = 2;
const Z_HEAD: u8 = 3;
const Z_LABEL: u8 = 4;
const Z_BOARD: u8 = u8::MAX;

/// Lines longer than this many cells in either direction are clipped
const MAX_SPAN: i32 = 4096;

/// Semantic color of a cell, mapped to terminal colors by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Plain,
    Board,
    Title,
    Status,
    Edge,
    Highlight,
    Trail,
    Pulse,
    Label,
    FadedLabel,
}

/// One character cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub tone: Tone,
    z: u8,
}

impl Cell {
    pub const BLANK: Cell = Cell {
        ch: ' ',
        tone: Tone::Plain,
        z: Z_EMPTY,
    };

    pub fn is_blank(&self) -> bool {
        self.z == Z_EMPTY
    }
}

/// Overlay units per terminal cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellScale {
    pub x: f64,
    pub y: f64,
}

impl Default for CellScale {
    fn default() -> Self {
        Self { x: 4.0, y: 8.0 }
    }
}

impl CellScale {
    /// Cell containing `p`, or `None` for non-finite points
    pub fn to_cell(&self, p: Point) -> Option<(i32, i32)> {
        if !p.is_finite() {
            return None;
        }
        let col = (p.x / self.x).round().clamp(-(MAX_SPAN as f64), MAX_SPAN as f64) as i32;
        let row = (p.y / self.y).round().clamp(-(MAX_SPAN as f64), MAX_SPAN as f64) as i32;
        Some((col, row))
    }

    /// Overlay position of the top-left corner of a cell
    pub fn to_point(&self, col: u16, row: u16) -> Point {
        Point::new(col as f64 * self.x, row as f64 * self.y)
    }
}

/// Two-layer character grid
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u16,
    height: u16,
    scale: CellScale,
    board: Vec<Cell>,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: u16, height: u16, scale: CellScale) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            scale,
            board: vec![Cell::BLANK; len],
            cells: vec![Cell::BLANK; len],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn scale(&self) -> CellScale {
        self.scale
    }

    /// Change the grid size, clearing both layers
    pub fn resize(&mut self, width: u16, height: u16) {
        *self = Self::new(width, height, self.scale);
    }

    /// Reset the overlay layer to the board
    pub fn clear(&mut self) {
        self.cells.copy_from_slice(&self.board);
    }

    /// Erase the board
    pub fn clear_board(&mut self) {
        self.board.fill(Cell::BLANK);
        self.clear();
    }

    pub fn cell(&self, col: u16, row: u16) -> Option<&Cell> {
        self.index(col as i32, row as i32).map(|i| &self.cells[i])
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Characters of one row, trailing blanks included
    pub fn row_text(&self, row: u16) -> String {
        (0..self.width)
            .filter_map(|col| self.cell(col, row))
            .map(|cell| cell.ch)
            .collect()
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        let col = u16::try_from(col).ok()?;
        let row = u16::try_from(row).ok()?;
        (col < self.width && row < self.height)
            .then(|| row as usize * self.width as usize + col as usize)
    }

    /// Write a board character
    pub fn put_board(&mut self, col: u16, row: u16, ch: char, tone: Tone) {
        if let Some(i) = self.index(col as i32, row as i32) {
            let cell = Cell { ch, tone, z: Z_BOARD };
            self.board[i] = cell;
            self.cells[i] = cell;
        }
    }

    /// Write board text starting at `(col, row)`, clipped at the right edge
    pub fn text(&mut self, col: u16, row: u16, text: &str, tone: Tone) {
        for (i, ch) in text.chars().enumerate() {
            let Ok(offset) = u16::try_from(i) else {
                break;
            };
            self.put_board(col.saturating_add(offset), row, ch, tone);
        }
    }

    /// Draw a framed box on the board with `title` centered inside
    pub fn draw_box(&mut self, col: u16, row: u16, width: u16, height: u16, title: &str) {
        if width < 2 || height < 2 {
            return;
        }
        let right = col.saturating_add(width - 1);
        let bottom = row.saturating_add(height - 1);
        for c in col..=right {
            for r in row..=bottom {
                let ch = match (c == col, c == right, r == row, r == bottom) {
                    (true, _, true, _) => '┌',
                    (_, true, true, _) => '┐',
                    (true, _, _, true) => '└',
                    (_, true, _, true) => '┘',
                    (_, _, true, _) | (_, _, _, true) => '─',
                    (true, _, _, _) | (_, true, _, _) => '│',
                    _ => ' ',
                };
                self.put_board(c, r, ch, Tone::Board);
            }
        }

        let len = title.chars().count() as u16;
        let inner = width - 2;
        let start = col.saturating_add(1 + inner.saturating_sub(len) / 2);
        self.text(start, row.saturating_add(height / 2), title, Tone::Title);
    }

    /// Plot an overlay character; returns whether it landed
    fn plot(&mut self, col: i32, row: i32, ch: char, tone: Tone, z: u8) -> bool {
        let Some(i) = self.index(col, row) else {
            return false;
        };
        if self.cells[i].z > z {
            return false;
        }
        self.cells[i] = Cell { ch, tone, z };
        true
    }

    fn is_board(&self, col: i32, row: i32) -> bool {
        self.index(col, row)
            .map(|i| self.board[i].z == Z_BOARD)
            .unwrap_or(false)
    }

    fn stroke(&mut self, edge: &EdgeStroke) -> Result<()> {
        let (Some(a), Some(b)) = (self.scale.to_cell(edge.from), self.scale.to_cell(edge.to)) else {
            return Err(Error::NonFinite {
                item: format!("edge {}", edge.id),
            });
        };

        let dx = edge.to.x - edge.from.x;
        let dy = edge.to.y - edge.from.y;
        let (glyph, tone) = match edge.dash {
            Some(_) => (line_glyph(a, b, true), Tone::Highlight),
            None => (line_glyph(a, b, false), Tone::Edge),
        };

        let cells = line_cells(a, b);
        let step = if cells.len() > 1 {
            edge.from.distance(&edge.to) / (cells.len() - 1) as f64
        } else {
            0.0
        };

        let mut tip = None;
        for (i, &(col, row)) in cells.iter().enumerate() {
            if self.is_board(col, row) || self.index(col, row).is_none() {
                continue;
            }
            tip = Some((col, row));

            let visible = match edge.dash {
                Some(dash) if dash.on + dash.off > 0.0 => {
                    let along = i as f64 * step + dash.offset;
                    along.rem_euclid(dash.on + dash.off) < dash.on
                }
                _ => true,
            };
            if visible {
                self.plot(col, row, glyph, tone, Z_EDGE);
            }
        }

        if let Some((col, row)) = tip {
            self.plot(col, row, arrow_glyph(dx, dy), tone, Z_EDGE);
        }
        Ok(())
    }

    fn marker(&mut self, marker: &Marker) -> Result<()> {
        let Some((col, row)) = self.scale.to_cell(marker.center) else {
            return Err(Error::NonFinite {
                item: marker.pulse.to_string(),
            });
        };
        if self.is_board(col, row) {
            return Ok(());
        }
        match marker.trail {
            None => self.plot(col, row, '●', Tone::Pulse, Z_HEAD),
            Some(_) if marker.opacity >= 0.2 => self.plot(col, row, '•', Tone::Trail, Z_TRAIL),
            Some(_) if marker.opacity > 0.0 => self.plot(col, row, '·', Tone::Trail, Z_TRAIL),
            Some(_) => false,
        };
        Ok(())
    }

    fn label(&mut self, label: &Label) -> Result<()> {
        let Some((col, row)) = self.scale.to_cell(label.position) else {
            return Err(Error::NonFinite {
                item: format!("label of {}", label.pulse),
            });
        };
        let tone = if label.opacity >= 0.5 {
            Tone::Label
        } else if label.opacity > 0.05 {
            Tone::FadedLabel
        } else {
            return Ok(());
        };

        let width = label.text.chars().count() as i32;
        let start = col - width / 2;
        for (i, ch) in label.text.chars().enumerate() {
            let c = start + i as i32;
            if !self.is_board(c, row) {
                self.plot(c, row, ch, tone, Z_LABEL);
            }
        }
        Ok(())
    }
}

impl Surface for Canvas {
    type Error = Error;

    fn begin_frame(&mut self) -> Result<()> {
        self.clear();
        Ok(())
    }

    fn draw(&mut self, item: &DrawItem) -> Result<()> {
        match item {
            DrawItem::Edge(edge) => self.stroke(edge),
            DrawItem::Marker(marker) => self.marker(marker),
            DrawItem::Label(label) => self.label(label),
        }
    }
}

/// Cells on the segment `a -> b`, both ends included
fn line_cells(a: (i32, i32), b: (i32, i32)) -> Vec<(i32, i32)> {
    let (mut x, mut y) = a;
    let dx = (b.0 - a.0).abs();
    let dy = -(b.1 - a.1).abs();
    let sx = if a.0 < b.0 { 1 } else { -1 };
    let sy = if a.1 < b.1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    loop {
        cells.push((x, y));
        if x == b.0 && y == b.1 {
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
    cells
}

fn line_glyph(a: (i32, i32), b: (i32, i32), heavy: bool) -> char {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    if dy.abs() * 2 <= dx.abs() {
        if heavy {
            '━'
        } else {
            '─'
        }
    } else if dx.abs() * 2 <= dy.abs() {
        if heavy {
            '┃'
        } else {
            '│'
        }
    } else if (dx > 0) == (dy > 0) {
        '╲'
    } else {
        '╱'
    }
}

fn arrow_glyph(dx: f64, dy: f64) -> char {
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 {
            '▶'
        } else {
            '◀'
        }
    } else if dy > 0.0 {
        '▼'
    } else {
        '▲'
    }
}
