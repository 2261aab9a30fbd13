use crate::graph::NodeId;
use std::collections::BTreeMap;

/// On-screen size of a person's box, supplied by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Footprint {
    pub width: f32,
    pub height: f32,
}

impl Footprint {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Position relative to the root before global translation: `x` in layout
/// units, `generation` counted downwards from the root's row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPoint {
    pub x: f32,
    pub generation: i32,
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// Complete coordinate assignment for one root and one visible set.
///
/// Person points are box centers; union points are the anchors where the
/// partner and child lines meet.
#[derive(Debug, Clone)]
pub struct FamilyLayout {
    pub root: NodeId,
    pub positions: BTreeMap<NodeId, Point>,
    pub local: BTreeMap<NodeId, LocalPoint>,
    pub footprints: BTreeMap<NodeId, Footprint>,
    pub width: f32,
    pub height: f32,
}

impl FamilyLayout {
    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn for_each(&self, mut f: impl FnMut(NodeId, Point)) {
        for (id, point) in &self.positions {
            f(*id, *point);
        }
    }

    /// `(left, top, right, bottom)` of a person's box; unions have none.
    pub fn bounds(&self, id: NodeId) -> Option<(f32, f32, f32, f32)> {
        let point = self.positions.get(&id)?;
        let footprint = self.footprints.get(&id)?;
        let half_w = footprint.width / 2.0;
        let half_h = footprint.height / 2.0;
        Some((
            point.x - half_w,
            point.y - half_h,
            point.x + half_w,
            point.y + half_h,
        ))
    }
}
