//! Flowpulse Term - Terminal surface for flowpulse overlays
//!
//! - `Canvas` - Character grid that rasterizes the display list over a static board
//! - `TermSurface` - Canvas flushed to a terminal with `crossterm`, redrawing only changed cells
//!
//! Overlay coordinates map to cells through a `CellScale`: with the default
//! scale one column is 4 units wide and one row 8 units tall.

mod canvas;
mod error;
mod terminal;

pub use canvas::{Canvas, Cell, CellScale, Tone};
pub use error::{Error, Result};
pub use terminal::TermSurface;
