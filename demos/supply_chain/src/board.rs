//! Supplier, warehouse and customer tiles laid out across the terminal

use flowpulse_core::{Rect, Region};
use flowpulse_term::{Canvas, CellScale};

/// Scope every tile anchor is declared in
pub const BOARD_SCOPE: &str = "board";

const TILE_WIDTH: u16 = 14;
const TILE_HEIGHT: u16 = 4;
const MARGIN: u16 = 2;

/// The three nodes of the supply chain, left to right
const TILES: [(&str, &str); 3] = [("SUP", "SUPPLIERS"), ("WH", "WAREHOUSE"), ("CUST", "CUSTOMERS")];

/// One tile in cell coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub anchor: &'static str,
    pub title: &'static str,
    pub col: u16,
    pub row: u16,
    pub width: u16,
    pub height: u16,
}

/// Tile placement for one terminal size
#[derive(Debug, Clone)]
pub struct Board {
    pub width: u16,
    pub height: u16,
    pub tiles: Vec<Tile>,
}

impl Board {
    /// Spread the tiles evenly across a `width` x `height` terminal
    pub fn layout(width: u16, height: u16) -> Self {
        let row = height.saturating_sub(TILE_HEIGHT) / 2;
        let span = width.saturating_sub(2 * MARGIN + TILE_WIDTH);
        let last = (TILES.len() - 1) as u32;

        let tiles = TILES
            .iter()
            .enumerate()
            .map(|(i, &(anchor, title))| Tile {
                anchor,
                title,
                col: MARGIN + (span as u32 * i as u32 / last) as u16,
                row,
                width: TILE_WIDTH,
                height: TILE_HEIGHT,
            })
            .collect();

        Self {
            width,
            height,
            tiles,
        }
    }

    /// Bounds of the whole overlay in overlay units
    pub fn origin(&self, scale: CellScale) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.width as f64 * scale.x,
            self.height as f64 * scale.y,
        )
    }

    /// One region per tile, covering the whole tile
    pub fn regions(&self, scale: CellScale) -> Vec<Region> {
        self.tiles
            .iter()
            .map(|tile| {
                let corner = scale.to_point(tile.col, tile.row);
                let rect = Rect::new(
                    corner.x,
                    corner.y,
                    tile.width as f64 * scale.x,
                    tile.height as f64 * scale.y,
                );
                Region::new(tile.anchor, rect).in_scope(BOARD_SCOPE)
            })
            .collect()
    }

    /// Draw the tiles onto the canvas board layer
    pub fn paint(&self, canvas: &mut Canvas) {
        for tile in &self.tiles {
            canvas.draw_box(tile.col, tile.row, tile.width, tile.height, tile.title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowpulse_core::{AnchorRegistry, CollisionPolicy, ScopeId, StaticRegions};

    #[test]
    fn test_tiles_spread_left_to_right() {
        let board = Board::layout(80, 24);
        let cols: Vec<u16> = board.tiles.iter().map(|t| t.col).collect();
        assert_eq!(cols, vec![2, 33, 64]);
        assert!(board.tiles.iter().all(|t| t.row == 10));
        assert!(board.tiles.iter().all(|t| t.col + t.width <= 80));
    }

    #[test]
    fn test_anchor_at_tile_center() {
        let scale = CellScale::default();
        let board = Board::layout(80, 24);
        let layout = StaticRegions::new(board.origin(scale));
        let layout = board
            .regions(scale)
            .into_iter()
            .fold(layout, |layout, region| layout.with_region(region));

        let mut registry =
            AnchorRegistry::new(CollisionPolicy::FirstMatch).scoped(Some(ScopeId::from(BOARD_SCOPE)));
        let anchors = registry.recompute(&layout).unwrap();

        assert_eq!(anchors.len(), 3);
        let sup = anchors[&flowpulse_core::AnchorId::from("SUP")];
        assert_eq!(scale.to_cell(sup), Some((9, 12)));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let board = Board::layout(5, 2);
        assert_eq!(board.tiles.len(), 3);
        let mut canvas = Canvas::new(5, 2, CellScale::default());
        board.paint(&mut canvas);
    }

    #[test]
    fn test_paint_titles() {
        let board = Board::layout(80, 24);
        let mut canvas = Canvas::new(80, 24, CellScale::default());
        board.paint(&mut canvas);
        assert!(canvas.row_text(12).contains("WAREHOUSE"));
        assert!(canvas.row_text(10).starts_with("  ┌"));
    }
}
