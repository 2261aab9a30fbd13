use thiserror::Error;

use crate::ir::Side;

pub type Result<T> = std::result::Result<T, FamilyError>;

/// Every fault the core can detect. All of them abort the current render.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FamilyError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: person `{name}` is defined more than once")]
    DuplicatePerson { name: String, line: usize },

    #[error("line {line}: union `{name}` is defined more than once")]
    DuplicateUnion { name: String, line: usize },

    #[error("`{entity}`: attribute `{key}:` is not allowed on a {kind}")]
    DisallowedAttribute {
        entity: String,
        key: char,
        kind: &'static str,
    },

    #[error("`{0}` is listed as their own child")]
    SelfChild(String),

    #[error("`{child}` is listed more than once as a child of `{union}`")]
    DuplicateChild { union: String, child: String },

    #[error("`{child}` is listed as a child of both `{first}` and `{second}`")]
    MultipleParentUnions {
        child: String,
        first: String,
        second: String,
    },

    #[error("`{person}` is on the {side} side of more than one union: `{first}` and `{second}`")]
    DuplicateSide {
        person: String,
        side: Side,
        first: String,
        second: String,
    },

    #[error("cycle in family graph: {path}")]
    Cycle { path: String },

    #[error("family graph has {count} connected components: {summary}")]
    MultipleComponents { count: usize, summary: String },

    #[error("`{referenced_by}` references `{name}`, which is never defined")]
    DanglingReference { name: String, referenced_by: String },

    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("`{0}` is not in the visible set")]
    NotVisible(String),

    #[error("invalid detail level `{0}` (expected a number, `inf` or `all`)")]
    InvalidDetail(String),

    #[error("malformed navigation fragment `{0}`")]
    InvalidFragment(String),

    #[error("family file defines no persons")]
    NoPersons,

    #[error(
        "insufficient vertical spacing at union `{union}`: children start at {children_top:.1} but parents end at {parents_bottom:.1}; increase the row height"
    )]
    InsufficientRowHeight {
        union: String,
        parents_bottom: f32,
        children_top: f32,
    },

    #[error("cannot merge layouts around `{anchor}`: the two sides share no generation row")]
    NoSeparatingShift { anchor: String },
}
