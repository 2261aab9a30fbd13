//! Bipartite person/union graph built from parsed records.
//!
//! Edges only ever connect a union to one of its two members or to one of
//! its children. Unions name their members explicitly by [`NodeId`] and
//! [`Side`]; nothing is recovered from name strings after construction.

use crate::error::{FamilyError, Result};
use crate::ir::{
    Attribute, FamilyRecords, Lifespan, Record, RecordKind, Side, display_name,
    is_placeholder_key, union_display_name,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Person {
    pub key: String,
    pub notes: Vec<String>,
    pub lifespan: Option<Lifespan>,
    pub photo: Option<String>,
    /// False while the person is only referenced by a union.
    pub defined: bool,
    pub line: Option<usize>,
}

impl Person {
    pub fn display_name(&self) -> &str {
        display_name(&self.key)
    }

    pub fn is_placeholder(&self) -> bool {
        is_placeholder_key(&self.key)
    }
}

#[derive(Debug, Clone)]
pub struct Union {
    pub left: NodeId,
    pub right: NodeId,
    pub children: Vec<NodeId>,
    pub notes: Vec<String>,
    pub lifespan: Option<Lifespan>,
    pub line: usize,
}

impl Union {
    pub fn member(&self, side: Side) -> NodeId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn side_of(&self, person: NodeId) -> Option<Side> {
        if person == self.left {
            Some(Side::Left)
        } else if person == self.right {
            Some(Side::Right)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Person(Person),
    Union(Union),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    adjacency: Vec<Vec<NodeId>>,
    side_unions: HashMap<(NodeId, Side), NodeId>,
    parent_union: HashMap<NodeId, NodeId>,
}

impl FamilyGraph {
    /// Builds the adjacency structure. Attribute whitelists, self-parenting
    /// and same-side conflicts are checked here; connectivity, cycles and
    /// dangling references are left to [`crate::validate::validate`].
    pub fn build(records: &FamilyRecords) -> Result<Self> {
        let mut graph = FamilyGraph::default();
        for record in &records.records {
            match &record.kind {
                RecordKind::Person { name } => graph.define_person(name, record)?,
                RecordKind::Union { left, right } => graph.add_union(left, right, record)?,
            }
        }
        log::debug!(
            "family graph: {} nodes, {} unions",
            graph.len(),
            graph.unions().count()
        );
        Ok(graph)
    }

    fn define_person(&mut self, name: &str, record: &Record) -> Result<()> {
        let id = self.ensure_person(name);
        let NodeKind::Person(person) = &mut self.nodes[id.0].kind else {
            return Err(FamilyError::UnknownEntity(name.to_string()));
        };
        person.defined = true;
        person.line = Some(record.line);
        for attribute in &record.attributes {
            match attribute {
                Attribute::Note(note) => person.notes.push(note.clone()),
                Attribute::Lifespan(lifespan) => person.lifespan = Some(lifespan.clone()),
                Attribute::Photo(photo) => person.photo = Some(photo.clone()),
                Attribute::Children(_) => {
                    return Err(FamilyError::DisallowedAttribute {
                        entity: display_name(name).to_string(),
                        key: attribute.key(),
                        kind: "person",
                    });
                }
            }
        }
        Ok(())
    }

    fn add_union(&mut self, left: &str, right: &str, record: &Record) -> Result<()> {
        let name = record.name();
        let left_id = self.ensure_person(left);
        let right_id = self.ensure_person(right);

        let mut union = Union {
            left: left_id,
            right: right_id,
            children: Vec::new(),
            notes: Vec::new(),
            lifespan: None,
            line: record.line,
        };
        for attribute in &record.attributes {
            match attribute {
                Attribute::Note(note) => union.notes.push(note.clone()),
                Attribute::Lifespan(lifespan) => union.lifespan = Some(lifespan.clone()),
                Attribute::Children(children) => {
                    for child in children {
                        if child == left || child == right {
                            return Err(FamilyError::SelfChild(display_name(child).to_string()));
                        }
                        let child_id = self.ensure_person(child);
                        if union.children.contains(&child_id) {
                            return Err(FamilyError::DuplicateChild {
                                union: union_display_name(left, right),
                                child: display_name(child).to_string(),
                            });
                        }
                        union.children.push(child_id);
                    }
                }
                Attribute::Photo(_) => {
                    return Err(FamilyError::DisallowedAttribute {
                        entity: union_display_name(left, right),
                        key: attribute.key(),
                        kind: "union",
                    });
                }
            }
        }

        // Children mentioned here for the first time were pushed above.
        let id = NodeId(self.nodes.len());
        for (member, side) in [(left_id, Side::Left), (right_id, Side::Right)] {
            if let Some(existing) = self.side_unions.insert((member, side), id) {
                return Err(FamilyError::DuplicateSide {
                    person: self.display_name(member).to_string(),
                    side,
                    first: self.display_name(existing),
                    second: union_display_name(left, right),
                });
            }
        }
        for &child in &union.children {
            if let Some(existing) = self.parent_union.insert(child, id) {
                return Err(FamilyError::MultipleParentUnions {
                    child: self.display_name(child).to_string(),
                    first: self.display_name(existing),
                    second: union_display_name(left, right),
                });
            }
        }

        let neighbors: Vec<NodeId> = [left_id, right_id]
            .into_iter()
            .chain(union.children.iter().copied())
            .collect();
        self.push_node(name, NodeKind::Union(union));
        for neighbor in neighbors {
            self.adjacency[id.0].push(neighbor);
            self.adjacency[neighbor.0].push(id);
        }
        Ok(())
    }

    fn ensure_person(&mut self, key: &str) -> NodeId {
        if let Some(id) = self.index.get(key) {
            return *id;
        }
        // Placeholders are always defined: they exist by being mentioned.
        let person = Person {
            key: key.to_string(),
            defined: is_placeholder_key(key),
            ..Person::default()
        };
        self.push_node(key.to_string(), NodeKind::Person(person))
    }

    fn push_node(&mut self, name: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.index.insert(name.clone(), id);
        self.nodes.push(Node { name, kind });
        self.adjacency.push(Vec::new());
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in first-mention order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn persons(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids().filter(|id| self.person(*id).is_some())
    }

    pub fn unions(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids().filter(|id| self.union(*id).is_some())
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<NodeId> {
        self.lookup(name)
            .ok_or_else(|| FamilyError::UnknownEntity(name.to_string()))
    }

    /// Key used in navigation links and state pairs. Named persons link by
    /// name. Placeholders link by `@<index>`, with extra leading `@`s when a
    /// real name already reads that way.
    pub fn link_key(&self, id: NodeId) -> String {
        if !self.person(id).is_some_and(Person::is_placeholder) {
            return self.name(id).to_string();
        }
        let mut key = format!("@{}", id.0);
        while self.index.contains_key(&key) {
            key.insert(0, '@');
        }
        key
    }

    /// Inverse of [`FamilyGraph::link_key`]; plain names resolve as usual.
    pub fn resolve_link_key(&self, key: &str) -> Result<NodeId> {
        if let Some(id) = self.lookup(key) {
            return Ok(id);
        }
        key.strip_prefix('@')
            .map(|rest| rest.trim_start_matches('@'))
            .and_then(|index| index.parse::<usize>().ok())
            .map(NodeId)
            .filter(|id| id.0 < self.nodes.len())
            .filter(|id| self.person(*id).is_some_and(Person::is_placeholder))
            .ok_or_else(|| FamilyError::UnknownEntity(key.to_string()))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Unique internal key (placeholder suffixes included).
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// User-facing label; placeholder suffixes never appear here.
    pub fn display_name(&self, id: NodeId) -> String {
        match &self.nodes[id.0].kind {
            NodeKind::Person(person) => person.display_name().to_string(),
            NodeKind::Union(union) => union_display_name(self.name(union.left), self.name(union.right)),
        }
    }

    pub fn person(&self, id: NodeId) -> Option<&Person> {
        match &self.nodes[id.0].kind {
            NodeKind::Person(person) => Some(person),
            NodeKind::Union(_) => None,
        }
    }

    pub fn union(&self, id: NodeId) -> Option<&Union> {
        match &self.nodes[id.0].kind {
            NodeKind::Union(union) => Some(union),
            NodeKind::Person(_) => None,
        }
    }

    pub fn is_union(&self, id: NodeId) -> bool {
        self.union(id).is_some()
    }

    /// First named person defined in the file, the default root.
    pub fn first_person(&self) -> Option<NodeId> {
        self.persons().min_by_key(|id| {
            self.person(*id).map_or((true, usize::MAX), |person| {
                (person.is_placeholder(), person.line.unwrap_or(usize::MAX))
            })
        })
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        &self.adjacency[id.0]
    }

    /// The union in which `person` occupies `side`. Construction rejects a
    /// second union on the same side, so there is at most one.
    pub fn union_on_side(&self, person: NodeId, side: Side) -> Option<NodeId> {
        self.side_unions.get(&(person, side)).copied()
    }

    /// The union that lists `person` as a child.
    pub fn union_above(&self, person: NodeId) -> Option<NodeId> {
        self.parent_union.get(&person).copied()
    }

    /// Children of `union` in file order; empty for persons.
    pub fn children_of(&self, union: NodeId) -> &[NodeId] {
        match self.union(union) {
            Some(union) => &union.children,
            None => &[],
        }
    }

    /// Both members of `union`, left first.
    pub fn members(&self, union: NodeId) -> Option<[NodeId; 2]> {
        self.union(union).map(|union| [union.left, union.right])
    }

    /// Unions `person` is a member of, left-role union first.
    pub fn spouse_unions(&self, person: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        [Side::Left, Side::Right]
            .into_iter()
            .filter_map(move |side| self.union_on_side(person, side))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_records;

    fn graph(input: &str) -> Result<FamilyGraph> {
        FamilyGraph::build(&parse_records(input)?)
    }

    #[test]
    fn builds_bipartite_adjacency() {
        let g = graph("Alice\nBob\nAlice + Bob\n  c: Carol, Dan\nCarol\nDan\n").unwrap();
        let union = g.require("Alice + Bob").unwrap();
        let alice = g.require("Alice").unwrap();
        let carol = g.require("Carol").unwrap();
        let dan = g.require("Dan").unwrap();

        assert_eq!(g.neighbors(union).len(), 4);
        assert_eq!(g.neighbors(alice), &[union]);
        assert_eq!(g.children_of(union), &[carol, dan]);
        assert_eq!(g.union_above(carol), Some(union));
        assert_eq!(g.union_on_side(alice, Side::Left), Some(union));
        assert_eq!(g.union_on_side(alice, Side::Right), None);
        assert_eq!(g.union(union).unwrap().side_of(g.require("Bob").unwrap()), Some(Side::Right));
        for id in g.ids() {
            for neighbor in g.neighbors(id) {
                assert_ne!(g.is_union(id), g.is_union(*neighbor));
            }
        }
    }

    #[test]
    fn union_edges_survive_children_declared_later() {
        let g = graph(
            "Gpa\nGma\nGpa + Gma\n  c: Alice, Uncle\nAlice\nUncle\nBob\nAlice + Bob\n  c: Carol\nCarol\n",
        )
        .unwrap();
        let elders = g.require("Gpa + Gma").unwrap();
        let couple = g.require("Alice + Bob").unwrap();
        let alice = g.require("Alice").unwrap();
        let carol = g.require("Carol").unwrap();

        assert!(g.is_union(elders) && g.is_union(couple));
        assert_eq!(g.union_above(alice), Some(elders));
        assert_eq!(g.union_above(carol), Some(couple));
        assert_eq!(g.union_on_side(alice, Side::Left), Some(couple));
        assert_eq!(g.neighbors(couple).len(), 3);
        assert_eq!(g.neighbors(carol), &[couple]);
        crate::validate::validate(&g).unwrap();
    }

    #[test]
    fn remarriage_uses_both_sides() {
        let g = graph("A\nB\nC\nA + B\nC + A\n").unwrap();
        let a = g.require("A").unwrap();
        let unions: Vec<&str> = g.spouse_unions(a).map(|id| g.name(id)).collect();
        assert_eq!(unions, vec!["A + B", "C + A"]);
    }

    #[test]
    fn same_side_twice_is_structural_error() {
        let err = graph("A\nB\nC\nA + B\nA + C\n").unwrap_err();
        assert!(matches!(
            err,
            FamilyError::DuplicateSide { side: Side::Left, .. }
        ));
    }

    #[test]
    fn rejects_own_child_and_bad_attributes() {
        assert_eq!(
            graph("A\nB\nA + B\n  c: A\n").unwrap_err(),
            FamilyError::SelfChild("A".into())
        );
        assert!(matches!(
            graph("A\n  c: B\n").unwrap_err(),
            FamilyError::DisallowedAttribute { key: 'c', kind: "person", .. }
        ));
        assert!(matches!(
            graph("A\nB\nA + B\n  p: wedding.jpg\n").unwrap_err(),
            FamilyError::DisallowedAttribute { key: 'p', kind: "union", .. }
        ));
        assert!(matches!(
            graph("A\nB\nA + B\n  c: C, C\nC\n").unwrap_err(),
            FamilyError::DuplicateChild { .. }
        ));
    }

    #[test]
    fn child_of_two_unions_is_rejected() {
        let err = graph("A\nB\nC\nD\nA + B\n  c: E\nC + D\n  c: E\nE\n").unwrap_err();
        assert!(matches!(err, FamilyError::MultipleParentUnions { .. }));
    }

    #[test]
    fn undefined_members_are_kept_for_validation() {
        let g = graph("A\nA + Ghost\n").unwrap();
        let ghost = g.require("Ghost").unwrap();
        assert!(!g.person(ghost).unwrap().defined);
    }

    #[test]
    fn placeholder_link_keys_hide_the_suffix() {
        let g = graph("A\n@2\nA + ?\n@2 + A\n").unwrap();
        let union = g.union_on_side(g.require("A").unwrap(), Side::Left).unwrap();
        let [_, unknown] = g.members(union).unwrap();
        let key = g.link_key(unknown);
        assert!(!key.contains(','), "{key}");
        assert!(key.starts_with('@'));
        assert_eq!(g.resolve_link_key(&key).unwrap(), unknown);

        let named = g.require("@2").unwrap();
        assert_eq!(g.link_key(named), "@2");
        assert_eq!(g.resolve_link_key("@2").unwrap(), named);
        assert_eq!(g.resolve_link_key("A").unwrap(), g.require("A").unwrap());
        assert!(g.resolve_link_key("@0").is_err());
        assert!(g.resolve_link_key("@99").is_err());
    }

    #[test]
    fn placeholders_display_without_suffix() {
        let g = graph("A\nA + ?\n").unwrap();
        let union = g.unions().next().unwrap();
        assert_eq!(g.display_name(union), "A + ?");
        let [_, unknown] = g.members(union).unwrap();
        assert_eq!(g.display_name(unknown), "?");
        assert!(g.person(unknown).unwrap().defined);
    }
}
