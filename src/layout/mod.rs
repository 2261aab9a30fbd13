mod merge;
pub(crate) mod text;
pub(crate) mod types;
pub use types::*;

use merge::{Block, Moving, Spacing, merge, merge_siblings};

use crate::config::LayoutConfig;
use crate::error::{FamilyError, Result};
use crate::graph::{FamilyGraph, NodeId, Person};
use crate::ir::Side;
use crate::visibility::VisibleSet;
use std::collections::BTreeMap;

const EPSILON: f32 = 1e-3;
// Children always sit one generation below their parents' union.
const CHILD_ROW: i32 = 1;

/// Lays out every visible node around `root`.
///
/// `footprint_of` is asked once per visible person. The result is a pure
/// function of its inputs, so callers may lay out again with refined
/// footprints at any time.
pub fn compute_family_layout(
    graph: &FamilyGraph,
    root: NodeId,
    visible: &VisibleSet,
    mut footprint_of: impl FnMut(&Person) -> Footprint,
    config: &LayoutConfig,
) -> Result<FamilyLayout> {
    if !visible.contains(&root) {
        return Err(FamilyError::NotVisible(graph.display_name(root)));
    }
    let footprints: BTreeMap<NodeId, Footprint> = visible
        .iter()
        .filter_map(|id| graph.person(*id).map(|person| (*id, footprint_of(person))))
        .collect();

    let block = {
        let engine = Engine {
            graph,
            visible,
            config,
            spacing: Spacing {
                footprints: &footprints,
                padding: config.box_padding,
            },
        };
        if graph.is_union(root) {
            engine.union_block(root, None, None)?
        } else {
            engine.person_block(root, None)?
        }
    }
    .anchored_at(root);

    let local: BTreeMap<NodeId, LocalPoint> = block
        .slots
        .iter()
        .map(|(id, slot)| {
            (
                *id,
                LocalPoint {
                    x: slot.x,
                    generation: slot.generation,
                },
            )
        })
        .collect();

    let mut layout = FamilyLayout {
        root,
        positions: BTreeMap::new(),
        local,
        footprints,
        width: 0.0,
        height: 0.0,
    };
    place_on_canvas(&mut layout, config);
    center_unions(&mut layout, graph)?;
    fit_canvas(&mut layout, config);

    log::debug!(
        "layout around `{}`: {} nodes, {:.0}x{:.0}",
        graph.display_name(root),
        layout.len(),
        layout.width,
        layout.height
    );
    Ok(layout)
}

struct Engine<'a> {
    graph: &'a FamilyGraph,
    visible: &'a VisibleSet,
    config: &'a LayoutConfig,
    spacing: Spacing<'a>,
}

impl Engine<'_> {
    /// `person` at the origin with their marriages beside them and their
    /// parents' union above. `from` is the node the walk arrived from and
    /// is never entered again.
    fn person_block(&self, person: NodeId, from: Option<NodeId>) -> Result<Block> {
        let mut block = Block::single(person);

        // Left role in a union means the partner stands to the east.
        if let Some(union) = self.next(self.graph.union_on_side(person, Side::Left), from) {
            let east = self.union_block(union, Some(person), None)?;
            block = merge(block, east, Moving::Right, &self.spacing, &self.label(union))?;
        }
        if let Some(union) = self.next(self.graph.union_on_side(person, Side::Right), from) {
            let west = self.union_block(union, Some(person), None)?;
            block = merge(west, block, Moving::Left, &self.spacing, &self.label(union))?;
        }
        if let Some(union) = self.next(self.graph.union_above(person), from) {
            block = self.union_block(union, Some(person), Some(block))?;
        }
        Ok(block.anchored_at(person))
    }

    /// `union` at the origin, its children one row below and its members on
    /// either side. When the walk came up from a child, that child's
    /// already computed block is passed in as `arrived`.
    fn union_block(
        &self,
        union: NodeId,
        from: Option<NodeId>,
        mut arrived: Option<Block>,
    ) -> Result<Block> {
        let label = self.label(union);
        let mut children: Option<Block> = None;
        for &child in self.graph.children_of(union) {
            let sub = if Some(child) == from {
                match arrived.take() {
                    Some(block) => block,
                    None => continue,
                }
            } else if self.visible.contains(&child) {
                self.person_block(child, Some(union))?
            } else {
                continue;
            };
            let sub = sub.translated(0.0, CHILD_ROW);
            children = Some(match children {
                None => sub,
                Some(placed) => merge_siblings(
                    placed,
                    sub,
                    CHILD_ROW,
                    self.config.sibling_overlay,
                    &self.spacing,
                    &label,
                )?,
            });
        }

        let mut block = match children {
            Some(mut block) => {
                let (min, max) = self
                    .graph
                    .children_of(union)
                    .iter()
                    .filter_map(|child| block.get(*child))
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), slot| {
                        (min.min(slot.x), max.max(slot.x))
                    });
                block.insert(union, (min + max) / 2.0, 0);
                block
            }
            None => Block::single(union),
        };

        let [left, right] = self
            .graph
            .members(union)
            .ok_or_else(|| FamilyError::UnknownEntity(label.clone()))?;
        if let Some(left) = self.next(Some(left), from) {
            let west = self.person_block(left, Some(union))?;
            block = merge(west, block, Moving::Left, &self.spacing, &label)?;
        }
        if let Some(right) = self.next(Some(right), from) {
            let east = self.person_block(right, Some(union))?;
            block = merge(block, east, Moving::Right, &self.spacing, &label)?;
        }
        Ok(block.anchored_at(union))
    }

    fn next(&self, candidate: Option<NodeId>, from: Option<NodeId>) -> Option<NodeId> {
        candidate.filter(|id| Some(*id) != from && self.visible.contains(id))
    }

    fn label(&self, id: NodeId) -> String {
        self.graph.display_name(id)
    }
}

/// Scales generations to rows and moves the top-left content edge to the
/// configured margin.
fn place_on_canvas(layout: &mut FamilyLayout, config: &LayoutConfig) {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    for (id, local) in &layout.local {
        let y = local.generation as f32 * config.row_height;
        let (half_w, half_h) = half_size(layout, *id);
        min_x = min_x.min(local.x - half_w);
        min_y = min_y.min(y - half_h);
    }
    let dx = config.margin - min_x;
    let dy = config.margin - min_y;
    layout.positions = layout
        .local
        .iter()
        .map(|(id, local)| {
            (
                *id,
                Point {
                    x: local.x + dx,
                    y: local.generation as f32 * config.row_height + dy,
                },
            )
        })
        .collect();
}

/// Moves each union with rendered children halfway between the bottom of
/// its members' boxes and the top of its children's boxes.
fn center_unions(layout: &mut FamilyLayout, graph: &FamilyGraph) -> Result<()> {
    let unions: Vec<NodeId> = layout
        .positions
        .keys()
        .copied()
        .filter(|id| graph.is_union(*id))
        .collect();
    for union in unions {
        let children_top = graph
            .children_of(union)
            .iter()
            .filter_map(|child| layout.bounds(*child))
            .map(|(_, top, _, _)| top)
            .reduce(f32::min);
        let Some(children_top) = children_top else {
            continue;
        };
        let parents_bottom = graph
            .members(union)
            .into_iter()
            .flatten()
            .filter_map(|member| layout.bounds(member))
            .map(|(_, _, _, bottom)| bottom)
            .reduce(f32::max);
        let Some(parents_bottom) = parents_bottom else {
            continue;
        };
        if children_top < parents_bottom - EPSILON {
            return Err(FamilyError::InsufficientRowHeight {
                union: graph.display_name(union),
                parents_bottom,
                children_top,
            });
        }
        if let Some(point) = layout.positions.get_mut(&union) {
            point.y = (parents_bottom + children_top) / 2.0;
        }
    }
    Ok(())
}

fn fit_canvas(layout: &mut FamilyLayout, config: &LayoutConfig) {
    let mut max_x: f32 = 0.0;
    let mut max_y: f32 = 0.0;
    for (id, point) in &layout.positions {
        let (half_w, half_h) = half_size(layout, *id);
        max_x = max_x.max(point.x + half_w);
        max_y = max_y.max(point.y + half_h);
    }
    layout.width = max_x + config.margin;
    layout.height = max_y + config.margin;
}

fn half_size(layout: &FamilyLayout, id: NodeId) -> (f32, f32) {
    layout
        .footprints
        .get(&id)
        .map(|footprint| (footprint.width / 2.0, footprint.height / 2.0))
        .unwrap_or((0.0, 0.0))
}
