//! Anchor registry
//!
//! Discovers tagged regions through a [`RegionProvider`] and publishes their
//! centers relative to the overlay origin. Every pass builds a fresh map and
//! swaps it in whole; a map handed out earlier is never patched.

use crate::{AnchorId, Point, RegionProvider, Result, ScopeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, trace};

/// Which region wins when several declare the same anchor id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// The first region in document order wins
    #[default]
    FirstMatch,
    /// The last region in document order wins
    LastMatch,
}

/// Anchor id to center point, in discovery order
pub type AnchorMap = IndexMap<AnchorId, Point>;

/// Owner of the current anchor map
#[derive(Debug, Clone)]
pub struct AnchorRegistry {
    scope: Option<ScopeId>,
    policy: CollisionPolicy,
    anchors: Rc<AnchorMap>,
    passes: u64,
}

impl AnchorRegistry {
    /// Create a registry that sees every region
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            scope: None,
            policy,
            anchors: Rc::new(AnchorMap::new()),
            passes: 0,
        }
    }

    /// Restrict discovery to regions nested in `scope`
    pub fn scoped(mut self, scope: Option<ScopeId>) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// The most recently published map
    pub fn anchors(&self) -> Rc<AnchorMap> {
        Rc::clone(&self.anchors)
    }

    /// Number of completed layout passes
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Look up one anchor in the current map
    pub fn get(&self, id: &AnchorId) -> Option<Point> {
        self.anchors.get(id).copied()
    }

    /// Measure every visible region and publish a new map
    ///
    /// Regions outside the scope are ignored. Regions with non-finite bounds
    /// are left unresolved for this pass.
    pub fn recompute<P: RegionProvider + ?Sized>(&mut self, provider: &P) -> Result<Rc<AnchorMap>> {
        let origin = provider.origin()?;
        let regions = provider.regions()?;

        let mut anchors = AnchorMap::with_capacity(regions.len());
        let mut duplicates = 0usize;

        for region in regions {
            if let Some(scope) = &self.scope {
                if !region.is_within(scope) {
                    continue;
                }
            }

            if !region.rect.is_finite() || !origin.is_finite() {
                debug!(anchor = %region.anchor, "skipping region with non-finite bounds");
                continue;
            }

            let center = region.rect.center();
            let point = Point::new(center.x - origin.x, center.y - origin.y);

            if anchors.contains_key(&region.anchor) {
                duplicates += 1;
                if self.policy == CollisionPolicy::FirstMatch {
                    continue;
                }
            }
            anchors.insert(region.anchor, point);
        }

        self.passes += 1;
        trace!(
            pass = self.passes,
            anchors = anchors.len(),
            duplicates,
            "anchor map recomputed"
        );
        if duplicates > 0 {
            debug!(duplicates, policy = ?self.policy, "duplicate anchor ids resolved");
        }

        self.anchors = Rc::new(anchors);
        Ok(self.anchors())
    }
}

impl Default for AnchorRegistry {
    fn default() -> Self {
        Self::new(CollisionPolicy::default())
    }
}
