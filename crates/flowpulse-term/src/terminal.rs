//! Terminal output
//!
//! [`TermSurface`] rasterizes into a [`Canvas`] and, at the end of each
//! frame, writes only the cells that changed since the previous frame.

use crate::{Canvas, Cell, Error, Result, Tone};
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use flowpulse_core::{DrawItem, Surface};
use std::io::Write;
use tracing::trace;

/// A canvas presented on a terminal
pub struct TermSurface<W: Write> {
    out: W,
    canvas: Canvas,
    shown: Option<Vec<Cell>>,
}

impl<W: Write> TermSurface<W> {
    pub fn new(out: W, canvas: Canvas) -> Self {
        Self {
            out,
            canvas,
            shown: None,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Board edits made here show up on the next frame
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Adopt a new terminal size; the next frame repaints everything
    pub fn resize(&mut self, width: u16, height: u16) {
        self.canvas.resize(width, height);
        self.invalidate();
    }

    /// Force a full repaint on the next frame
    pub fn invalidate(&mut self) {
        self.shown = None;
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn present(&mut self) -> Result<usize> {
        let width = self.canvas.width() as usize;
        let cells = self.canvas.cells();
        let full = self.shown.as_ref().map_or(true, |shown| shown.len() != cells.len());
        if full {
            queue!(self.out, Clear(ClearType::All))?;
        }

        let mut written = 0;
        let mut tone = None;
        let mut cursor = None;
        for (i, cell) in cells.iter().enumerate() {
            let unchanged = !full && self.shown.as_ref().map(|s| &s[i]) == Some(cell);
            if unchanged || (full && cell.is_blank()) {
                continue;
            }

            let col = (i % width) as u16;
            let row = (i / width) as u16;
            if cursor != Some((col, row)) {
                queue!(self.out, MoveTo(col, row))?;
            }
            if tone != Some(cell.tone) {
                queue!(self.out, SetForegroundColor(color(cell.tone)))?;
                tone = Some(cell.tone);
            }
            queue!(self.out, Print(cell.ch))?;
            cursor = Some((col + 1, row));
            written += 1;
        }

        queue!(self.out, ResetColor)?;
        self.out.flush()?;
        self.shown = Some(cells.to_vec());
        Ok(written)
    }
}

impl<W: Write> Surface for TermSurface<W> {
    type Error = Error;

    fn begin_frame(&mut self) -> Result<()> {
        self.canvas.begin_frame()
    }

    fn draw(&mut self, item: &DrawItem) -> Result<()> {
        self.canvas.draw(item)
    }

    fn end_frame(&mut self) -> Result<()> {
        let written = self.present()?;
        trace!(cells = written, "terminal frame presented");
        Ok(())
    }
}

/// Terminal color for a tone
pub fn color(tone: Tone) -> Color {
    match tone {
        Tone::Plain => Color::Reset,
        Tone::Board => Color::Grey,
        Tone::Title => Color::Green,
        Tone::Status => Color::DarkGrey,
        Tone::Edge => Color::DarkGrey,
        Tone::Highlight => Color::Yellow,
        Tone::Trail => Color::DarkCyan,
        Tone::Pulse => Color::Cyan,
        Tone::Label => Color::White,
        Tone::FadedLabel => Color::DarkGrey,
    }
}
