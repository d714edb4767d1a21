//! Static flow topology

use crate::{AnchorId, AnchorMap, EdgeId};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A directed connection between two anchors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: EdgeId,
    pub from: AnchorId,
    pub to: AnchorId,
    #[serde(default)]
    pub highlight: bool,
}

impl FlowEdge {
    /// Create an edge with the conventional `from->to` id
    pub fn new(from: impl Into<AnchorId>, to: impl Into<AnchorId>) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            id: EdgeId::between(&from, &to),
            from,
            to,
            highlight: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn connects(&self, from: &AnchorId, to: &AnchorId) -> bool {
        &self.from == from && &self.to == to
    }
}

/// An edge endpoint the current anchor map cannot resolve
#[derive(Debug, Clone, PartialEq)]
pub struct MissingAnchor {
    pub edge: EdgeId,
    pub anchor: AnchorId,
}

/// Ordered edge list
///
/// Edits build a new list and swap it in; a slice obtained from
/// [`Topology::edges`] never changes underneath its holder.
#[derive(Debug, Clone)]
pub struct Topology {
    edges: Rc<[FlowEdge]>,
}

impl Topology {
    pub fn new(edges: Vec<FlowEdge>) -> Self {
        Self {
            edges: Rc::from(edges),
        }
    }

    /// Current edge list
    pub fn edges(&self) -> Rc<[FlowEdge]> {
        Rc::clone(&self.edges)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn get(&self, id: &EdgeId) -> Option<&FlowEdge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    /// Edge ids connecting `from -> to`
    pub fn matching(&self, from: &AnchorId, to: &AnchorId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| e.connects(from, to))
            .map(|e| e.id.clone())
            .collect()
    }

    /// Set the highlight flag on the edge with `id`
    ///
    /// Returns false when the edge does not exist or already has that value.
    pub fn set_highlight(&mut self, id: &EdgeId, highlight: bool) -> bool {
        let changed = self
            .edges
            .iter()
            .any(|e| &e.id == id && e.highlight != highlight);
        if !changed {
            return false;
        }

        let next: Vec<FlowEdge> = self
            .edges
            .iter()
            .map(|e| {
                if &e.id == id {
                    FlowEdge {
                        highlight,
                        ..e.clone()
                    }
                } else {
                    e.clone()
                }
            })
            .collect();
        self.edges = Rc::from(next);
        true
    }

    /// Clear every highlight
    pub fn clear_highlights(&mut self) {
        if self.edges.iter().any(|e| e.highlight) {
            let next: Vec<FlowEdge> = self
                .edges
                .iter()
                .map(|e| FlowEdge {
                    highlight: false,
                    ..e.clone()
                })
                .collect();
            self.edges = Rc::from(next);
        }
    }

    /// Edge endpoints not present in `anchors`
    pub fn missing_anchors(&self, anchors: &AnchorMap) -> Vec<MissingAnchor> {
        let mut missing = Vec::new();
        for edge in self.edges.iter() {
            for anchor in [&edge.from, &edge.to] {
                if !anchors.contains_key(anchor) {
                    missing.push(MissingAnchor {
                        edge: edge.id.clone(),
                        anchor: anchor.clone(),
                    });
                }
            }
        }
        missing
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    #[test]
    fn test_set_highlight_replaces_list() {
        let mut topology = Topology::new(vec![FlowEdge::new("A", "B"), FlowEdge::new("B", "C")]);
        let before = topology.edges();

        assert!(topology.set_highlight(&EdgeId::from("A->B"), true));
        let after = topology.edges();

        assert!(!before[0].highlight);
        assert!(after[0].highlight);
        assert!(!after[1].highlight);
        assert!(!Rc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_set_highlight_noop() {
        let mut topology = Topology::new(vec![FlowEdge::new("A", "B")]);
        let before = topology.edges();
        assert!(!topology.set_highlight(&EdgeId::from("A->B"), false));
        assert!(!topology.set_highlight(&EdgeId::from("X->Y"), true));
        assert!(Rc::ptr_eq(&before, &topology.edges()));
    }

    #[test]
    fn test_matching() {
        let topology = Topology::new(vec![
            FlowEdge::new("A", "B"),
            FlowEdge::new("B", "A"),
            FlowEdge::new("A", "B").with_id("A->B#2"),
        ]);
        let ids = topology.matching(&"A".into(), &"B".into());
        assert_eq!(ids, vec![EdgeId::from("A->B"), EdgeId::from("A->B#2")]);
    }

    #[test]
    fn test_missing_anchors() {
        let topology = Topology::new(vec![FlowEdge::new("A", "B"), FlowEdge::new("B", "Z")]);
        let mut anchors = AnchorMap::new();
        anchors.insert("A".into(), Point::new(0.0, 0.0));
        anchors.insert("B".into(), Point::new(1.0, 0.0));

        let missing = topology.missing_anchors(&anchors);
        assert_eq!(
            missing,
            vec![MissingAnchor {
                edge: "B->Z".into(),
                anchor: "Z".into()
            }]
        );
    }
}
