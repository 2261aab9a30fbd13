//! Partial layouts and the collision-resolving merge between them.

use super::Footprint;
use crate::error::{FamilyError, Result};
use crate::graph::NodeId;
use std::collections::BTreeMap;

const EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Slot {
    pub x: f32,
    pub generation: i32,
}

/// A subtree laid out on its own, in coordinates relative to its anchor.
#[derive(Debug, Clone, Default)]
pub(super) struct Block {
    pub slots: BTreeMap<NodeId, Slot>,
}

impl Block {
    pub fn single(id: NodeId) -> Self {
        let mut block = Block::default();
        block.insert(id, 0.0, 0);
        block
    }

    pub fn insert(&mut self, id: NodeId, x: f32, generation: i32) {
        self.slots.insert(id, Slot { x, generation });
    }

    pub fn get(&self, id: NodeId) -> Option<Slot> {
        self.slots.get(&id).copied()
    }

    pub fn translated(mut self, dx: f32, dgen: i32) -> Self {
        for slot in self.slots.values_mut() {
            slot.x += dx;
            slot.generation += dgen;
        }
        self
    }

    /// Moves the block so `id` sits at the origin.
    pub fn anchored_at(self, id: NodeId) -> Self {
        match self.get(id) {
            Some(slot) => self.translated(-slot.x, -slot.generation),
            None => self,
        }
    }

    fn absorb(&mut self, other: Block) {
        self.slots.extend(other.slots);
    }
}

/// Horizontal clearance of each node: half the footprint plus padding for
/// persons, nothing for unions.
pub(super) struct Spacing<'a> {
    pub footprints: &'a BTreeMap<NodeId, Footprint>,
    pub padding: f32,
}

impl Spacing<'_> {
    pub fn half_extent(&self, id: NodeId) -> f32 {
        self.footprints
            .get(&id)
            .map(|footprint| footprint.width / 2.0 + self.padding)
            .unwrap_or(0.0)
    }

    fn interval(&self, id: NodeId, slot: Slot) -> (f32, f32) {
        let half = self.half_extent(id);
        (slot.x - half, slot.x + half)
    }
}

/// Which of the two blocks is translated; the other keeps its coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Moving {
    Left,
    Right,
}

/// Per-generation `(min, max)` horizontal extent of a block.
pub(super) fn row_extents(block: &Block, spacing: &Spacing<'_>) -> BTreeMap<i32, (f32, f32)> {
    let mut rows: BTreeMap<i32, (f32, f32)> = BTreeMap::new();
    for (id, slot) in &block.slots {
        let (lo, hi) = spacing.interval(*id, *slot);
        rows.entry(slot.generation)
            .and_modify(|(min, max)| {
                *min = min.min(lo);
                *max = max.max(hi);
            })
            .or_insert((lo, hi));
    }
    rows
}

/// Smallest rightward shift of `right` that clears `left` on every row the
/// two share. `None` when they share no row.
pub(super) fn separation(left: &Block, right: &Block, spacing: &Spacing<'_>) -> Option<f32> {
    let left_rows = row_extents(left, spacing);
    let right_rows = row_extents(right, spacing);
    left_rows
        .iter()
        .filter_map(|(generation, (_, left_max))| {
            right_rows
                .get(generation)
                .map(|(right_min, _)| left_max - right_min)
        })
        .reduce(f32::max)
}

/// Places `left` and `right` side by side without overlap and unions them.
pub(super) fn merge(
    left: Block,
    right: Block,
    moving: Moving,
    spacing: &Spacing<'_>,
    anchor: &str,
) -> Result<Block> {
    let shift = separation(&left, &right, spacing).ok_or_else(|| {
        FamilyError::NoSeparatingShift {
            anchor: anchor.to_string(),
        }
    })?;
    log::trace!("merge around `{anchor}`: shift {shift:.2} ({moving:?} side moves)");
    Ok(join(left, right, shift, moving))
}

/// Merges a sibling subtree to the right of the ones already placed.
///
/// With `overlay` set, first tries the tightest position that only clears
/// the sibling row itself, and keeps it when no individual box overlaps on
/// any shared row. Otherwise falls back to the row-extent shift.
pub(super) fn merge_siblings(
    placed: Block,
    next: Block,
    sibling_row: i32,
    overlay: bool,
    spacing: &Spacing<'_>,
    anchor: &str,
) -> Result<Block> {
    let full = separation(&placed, &next, spacing).ok_or_else(|| FamilyError::NoSeparatingShift {
        anchor: anchor.to_string(),
    })?;
    let mut shift = full;
    if overlay {
        let placed_row = row_extents(&placed, spacing).get(&sibling_row).copied();
        let next_row = row_extents(&next, spacing).get(&sibling_row).copied();
        if let (Some((_, placed_max)), Some((next_min, _))) = (placed_row, next_row) {
            let candidate = placed_max - next_min;
            if candidate < full - EPSILON && !overlaps(&placed, &next, candidate, spacing) {
                log::trace!("siblings under `{anchor}` interleave: {candidate:.2} < {full:.2}");
                shift = candidate;
            }
        }
    }
    Ok(join(placed, next, shift, Moving::Right))
}

fn join(left: Block, right: Block, shift: f32, moving: Moving) -> Block {
    match moving {
        Moving::Right => {
            let mut merged = left;
            merged.absorb(right.translated(shift, 0));
            merged
        }
        Moving::Left => {
            let mut merged = left.translated(-shift, 0);
            merged.absorb(right);
            merged
        }
    }
}

/// True when any node of `right`, shifted by `dx`, overlaps a node of
/// `left` on the same row. Zero-width union points only collide when they
/// fall strictly inside a box.
fn overlaps(left: &Block, right: &Block, dx: f32, spacing: &Spacing<'_>) -> bool {
    let mut left_rows: BTreeMap<i32, Vec<(f32, f32)>> = BTreeMap::new();
    for (id, slot) in &left.slots {
        left_rows
            .entry(slot.generation)
            .or_default()
            .push(spacing.interval(*id, *slot));
    }
    right.slots.iter().any(|(id, slot)| {
        let (lo, hi) = spacing.interval(*id, *slot);
        let (lo, hi) = (lo + dx, hi + dx);
        left_rows.get(&slot.generation).is_some_and(|intervals| {
            intervals
                .iter()
                .any(|(other_lo, other_hi)| lo < other_hi - EPSILON && *other_lo < hi - EPSILON)
        })
    })
}
