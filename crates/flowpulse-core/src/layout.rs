//! Anchor sources and layout-change notification
//!
//! The overlay never inspects a render tree directly. Anything that can
//! report named rectangles in one coordinate space, plus the bounds of the
//! overlay root, implements [`RegionProvider`].

use crate::{AnchorId, Rect, Result, ScopeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// A tagged rectangle exposed by the layout
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Anchor this region declares
    pub anchor: AnchorId,
    /// Bounds in the provider's coordinate space
    pub rect: Rect,
    /// Every declared sub-region enclosing this one, outermost first
    pub scopes: Vec<ScopeId>,
}

impl Region {
    /// Create an unscoped region
    pub fn new(anchor: impl Into<AnchorId>, rect: Rect) -> Self {
        Self {
            anchor: anchor.into(),
            rect,
            scopes: Vec::new(),
        }
    }

    /// Nest this region inside a declared sub-region
    pub fn in_scope(mut self, scope: impl Into<ScopeId>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Check whether this region lies inside `scope`
    pub fn is_within(&self, scope: &ScopeId) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// What caused a layout pass
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutChange {
    /// First measurement after attaching
    Attached,
    /// The overlay root changed size
    RootResized,
    /// A tagged region changed size
    RegionResized(AnchorId),
    /// The hosting window changed size
    WindowResized,
    /// An ancestor scroll container moved (nested containers included)
    Scrolled { container: String },
}

/// Dirty flag a provider raises when geometry may have moved
///
/// Cloning yields another handle to the same flag.
#[derive(Clone, Default)]
pub struct LayoutSignal {
    pending: Rc<RefCell<Vec<LayoutChange>>>,
}

impl LayoutSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a layout change
    pub fn raise(&self, change: LayoutChange) {
        self.pending.borrow_mut().push(change);
    }

    /// Check for unconsumed changes
    pub fn is_raised(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Drain recorded changes
    pub fn take(&self) -> Vec<LayoutChange> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

impl fmt::Debug for LayoutSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutSignal")
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

/// Registration of a [`LayoutSignal`] with a provider
///
/// The observation ends when the watch is released or dropped.
pub struct LayoutWatch {
    release: Option<Box<dyn FnOnce()>>,
}

impl LayoutWatch {
    /// Create a watch that runs `release` exactly once
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A watch with nothing to release
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Stop observing
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for LayoutWatch {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for LayoutWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutWatch")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// A provider of named rectangular regions in a shared coordinate space
pub trait RegionProvider {
    /// Bounds of the overlay root; anchor coordinates are relative to its corner
    fn origin(&self) -> Result<Rect>;

    /// Every tagged region, in document order
    fn regions(&self) -> Result<Vec<Region>>;

    /// Raise `signal` whenever the root, a tagged region, the window or any
    /// ancestor scroll container changes geometry
    fn watch(&self, signal: LayoutSignal) -> Result<LayoutWatch>;
}

#[derive(Default)]
struct StaticState {
    origin: Rect,
    regions: Vec<Region>,
    watchers: Vec<(u64, LayoutSignal)>,
    next_watch: u64,
}

impl StaticState {
    fn notify(&self, change: LayoutChange) {
        for (_, signal) in &self.watchers {
            signal.raise(change.clone());
        }
    }
}

/// In-memory layout
///
/// Mutations notify every live watch. Cloning yields another handle to the
/// same layout, which lets a host keep editing regions after handing the
/// provider to an overlay.
#[derive(Clone, Default)]
pub struct StaticRegions {
    inner: Rc<RefCell<StaticState>>,
}

impl StaticRegions {
    /// Create an empty layout with the overlay root at `origin`
    pub fn new(origin: Rect) -> Self {
        let regions = Self::default();
        regions.inner.borrow_mut().origin = origin;
        regions
    }

    /// Add a region without notifying watchers
    pub fn with_region(self, region: Region) -> Self {
        self.inner.borrow_mut().regions.push(region);
        self
    }

    /// Move or resize the overlay root
    pub fn set_origin(&self, origin: Rect) {
        let mut state = self.inner.borrow_mut();
        state.origin = origin;
        state.notify(LayoutChange::RootResized);
    }

    /// Replace the whole layout, as after a window resize
    pub fn resize_window(&self, origin: Rect, regions: Vec<Region>) {
        let mut state = self.inner.borrow_mut();
        state.origin = origin;
        state.regions = regions;
        state.notify(LayoutChange::WindowResized);
    }

    /// Change the bounds of every region tagged `anchor`
    pub fn move_region(&self, anchor: &AnchorId, rect: Rect) {
        let mut state = self.inner.borrow_mut();
        let mut moved = false;
        for region in state.regions.iter_mut().filter(|r| &r.anchor == anchor) {
            region.rect = rect;
            moved = true;
        }
        if moved {
            state.notify(LayoutChange::RegionResized(anchor.clone()));
        }
    }

    /// Scroll a container, shifting every region nested inside it
    pub fn scroll(&self, container: &str, dx: f64, dy: f64) {
        let mut state = self.inner.borrow_mut();
        let scope = ScopeId::new(container);
        for region in state.regions.iter_mut().filter(|r| r.is_within(&scope)) {
            region.rect = region.rect.translate(-dx, -dy);
        }
        state.notify(LayoutChange::Scrolled {
            container: container.to_string(),
        });
    }

    /// Number of live watches
    pub fn watcher_count(&self) -> usize {
        self.inner.borrow().watchers.len()
    }
}

impl RegionProvider for StaticRegions {
    fn origin(&self) -> Result<Rect> {
        Ok(self.inner.borrow().origin)
    }

    fn regions(&self) -> Result<Vec<Region>> {
        Ok(self.inner.borrow().regions.clone())
    }

    fn watch(&self, signal: LayoutSignal) -> Result<LayoutWatch> {
        let id = {
            let mut state = self.inner.borrow_mut();
            let id = state.next_watch;
            state.next_watch += 1;
            state.watchers.push((id, signal));
            id
        };

        let weak: Weak<RefCell<StaticState>> = Rc::downgrade(&self.inner);
        Ok(LayoutWatch::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().watchers.retain(|(w, _)| *w != id);
            }
        }))
    }
}

impl fmt::Debug for StaticRegions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("StaticRegions")
            .field("origin", &state.origin)
            .field("regions", &state.regions.len())
            .field("watchers", &state.watchers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_raises_and_releases() {
        let layout = StaticRegions::new(Rect::new(0.0, 0.0, 300.0, 100.0))
            .with_region(Region::new("A", Rect::new(0.0, 0.0, 10.0, 10.0)));
        let signal = LayoutSignal::new();
        let watch = layout.watch(signal.clone()).unwrap();
        assert_eq!(layout.watcher_count(), 1);

        layout.move_region(&AnchorId::from("A"), Rect::new(5.0, 5.0, 10.0, 10.0));
        assert!(signal.is_raised());
        assert_eq!(
            signal.take(),
            vec![LayoutChange::RegionResized(AnchorId::from("A"))]
        );
        assert!(!signal.is_raised());

        watch.release();
        assert_eq!(layout.watcher_count(), 0);

        layout.set_origin(Rect::new(1.0, 1.0, 300.0, 100.0));
        assert!(!signal.is_raised());
    }

    #[test]
    fn test_dropping_watch_releases() {
        let layout = StaticRegions::new(Rect::default());
        {
            let _watch = layout.watch(LayoutSignal::new()).unwrap();
            assert_eq!(layout.watcher_count(), 1);
        }
        assert_eq!(layout.watcher_count(), 0);
    }

    #[test]
    fn test_move_unknown_region_is_silent() {
        let layout = StaticRegions::new(Rect::default());
        let signal = LayoutSignal::new();
        let _watch = layout.watch(signal.clone()).unwrap();
        layout.move_region(&AnchorId::from("missing"), Rect::default());
        assert!(!signal.is_raised());
    }

    #[test]
    fn test_scroll_shifts_nested_regions_only() {
        let layout = StaticRegions::new(Rect::default())
            .with_region(Region::new("A", Rect::new(0.0, 100.0, 10.0, 10.0)).in_scope("list"))
            .with_region(Region::new("B", Rect::new(0.0, 100.0, 10.0, 10.0)));
        let signal = LayoutSignal::new();
        let _watch = layout.watch(signal.clone()).unwrap();

        layout.scroll("list", 0.0, 40.0);

        let regions = layout.regions().unwrap();
        assert_eq!(regions[0].rect.y, 60.0);
        assert_eq!(regions[1].rect.y, 100.0);
        assert_eq!(
            signal.take(),
            vec![LayoutChange::Scrolled {
                container: "list".to_string()
            }]
        );
    }
}
