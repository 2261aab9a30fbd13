use std::fmt;

/// Separator between the two member names of a union line.
pub const UNION_SEPARATOR: &str = " + ";

/// Markers for unknown individuals. Every occurrence is a distinct person.
pub const PLACEHOLDER_MARKERS: [&str; 2] = ["?", "..."];

// Real names may not contain commas, so this suffix can never collide.
const PLACEHOLDER_SUFFIX: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lifespan {
    pub birth: Option<String>,
    pub death: Option<String>,
}

impl Lifespan {
    /// Human readable form, `None` when both ends are unknown.
    pub fn label(&self) -> Option<String> {
        match (self.birth.as_deref(), self.death.as_deref()) {
            (None, None) => None,
            (Some(birth), None) => Some(format!("{birth} -")),
            (None, Some(death)) => Some(format!("- {death}")),
            (Some(birth), Some(death)) => Some(format!("{birth} - {death}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Note(String),
    Lifespan(Lifespan),
    Photo(String),
    Children(Vec<String>),
}

impl Attribute {
    /// The line prefix this attribute was written with.
    pub fn key(&self) -> char {
        match self {
            Attribute::Note(_) => 'n',
            Attribute::Lifespan(_) => 'l',
            Attribute::Photo(_) => 'p',
            Attribute::Children(_) => 'c',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    Person { name: String },
    Union { left: String, right: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    pub line: usize,
    pub attributes: Vec<Attribute>,
}

impl Record {
    pub fn name(&self) -> String {
        match &self.kind {
            RecordKind::Person { name } => name.clone(),
            RecordKind::Union { left, right } => union_name(left, right),
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self.kind, RecordKind::Union { .. })
    }
}

/// Parsed record store, in file order. Placeholder persons sit next to the
/// record that introduced them.
#[derive(Debug, Clone, Default)]
pub struct FamilyRecords {
    pub records: Vec<Record>,
}

impl FamilyRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.name() == name)
    }
}

/// Unique key of a union, built from its members' keys.
pub fn union_name(left: &str, right: &str) -> String {
    format!("{left}{UNION_SEPARATOR}{right}")
}

/// User-facing union label with placeholder suffixes removed.
pub fn union_display_name(left: &str, right: &str) -> String {
    format!(
        "{}{UNION_SEPARATOR}{}",
        display_name(left),
        display_name(right)
    )
}

pub fn is_placeholder_marker(name: &str) -> bool {
    PLACEHOLDER_MARKERS.contains(&name)
}

pub fn placeholder_key(marker: &str, serial: usize) -> String {
    format!("{marker}{PLACEHOLDER_SUFFIX}{serial}")
}

pub fn is_placeholder_key(key: &str) -> bool {
    key.contains(PLACEHOLDER_SUFFIX)
}

/// Strips the disambiguating placeholder suffix, if any. Only meaningful for
/// person keys; use [`union_display_name`] for unions.
pub fn display_name(key: &str) -> &str {
    match key.split_once(PLACEHOLDER_SUFFIX) {
        Some((marker, _)) => marker,
        None => key,
    }
}
