//! Navigation state and asset-load bookkeeping for one rendered view.
//!
//! A [`Session`] pairs a root with a detail policy. It is built on first
//! load and replaced, never mutated, whenever the user re-roots.

use crate::config::LayoutConfig;
use crate::error::{FamilyError, Result};
use crate::graph::{FamilyGraph, NodeId, Person};
use crate::layout::{FamilyLayout, Footprint, compute_family_layout};
use crate::visibility::{VisibilityPolicy, VisibleSet, compute_visible};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Photo references that finished loading, by person.
pub type LoadedAssets = BTreeMap<NodeId, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    root: NodeId,
    policy: VisibilityPolicy,
}

impl Session {
    /// `root` is a person name or a link key from [`FamilyGraph::link_key`].
    pub fn new(graph: &FamilyGraph, root: &str, policy: VisibilityPolicy) -> Result<Self> {
        let root = graph.resolve_link_key(root)?;
        Ok(Self { root, policy })
    }

    /// A fresh session centered on `root` with the same detail policy.
    pub fn reroot(&self, graph: &FamilyGraph, root: &str) -> Result<Self> {
        Self::new(graph, root, self.policy)
    }

    pub fn with_policy(&self, policy: VisibilityPolicy) -> Self {
        Self {
            root: self.root,
            policy,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_name<'g>(&self, graph: &'g FamilyGraph) -> &'g str {
        graph.name(self.root)
    }

    pub fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    pub fn visible(&self, graph: &FamilyGraph) -> VisibleSet {
        compute_visible(graph, self.root, self.policy)
    }

    pub fn layout(
        &self,
        graph: &FamilyGraph,
        footprint_of: impl FnMut(&Person) -> Footprint,
        config: &LayoutConfig,
    ) -> Result<FamilyLayout> {
        let visible = self.visible(graph);
        log::debug!(
            "session `{}` ({}): {} of {} nodes visible",
            self.root_name(graph),
            self.policy,
            visible.len(),
            graph.len()
        );
        compute_family_layout(graph, self.root, &visible, footprint_of, config)
    }

    /// `(root, detail)` as plain strings, for deep links.
    pub fn to_state_pair(&self, graph: &FamilyGraph) -> (String, String) {
        (graph.link_key(self.root), self.policy.token())
    }

    pub fn from_state_pair(graph: &FamilyGraph, root: &str, detail: &str) -> Result<Self> {
        Self::new(graph, root, VisibilityPolicy::from_token(detail)?)
    }

    pub fn fragment(&self, graph: &FamilyGraph) -> String {
        fragment(&graph.link_key(self.root), self.policy)
    }

    /// Restores a session from a fragment produced by [`Session::fragment`].
    /// A leading `#` is ignored; a fragment without detail keeps the default
    /// policy.
    pub fn from_fragment(graph: &FamilyGraph, fragment: &str) -> Result<Self> {
        let (root, policy) = parse_fragment(fragment)?;
        Self::new(graph, &root, policy)
    }
}

/// `root:detail` with the root percent-encoded, so `:` and `%` inside names
/// survive the round trip.
pub fn fragment(root: &str, policy: VisibilityPolicy) -> String {
    format!("{}:{}", urlencoding::encode(root), policy.token())
}

pub fn parse_fragment(fragment: &str) -> Result<(String, VisibilityPolicy)> {
    let raw = fragment.strip_prefix('#').unwrap_or(fragment);
    let (root, policy) = match raw.rsplit_once(':') {
        Some((root, detail)) => (root, VisibilityPolicy::from_token(detail)?),
        None => (raw, VisibilityPolicy::default()),
    };
    let root = urlencoding::decode(root)
        .map_err(|_| FamilyError::InvalidFragment(fragment.to_string()))?;
    if root.is_empty() {
        return Err(FamilyError::InvalidFragment(fragment.to_string()));
    }
    Ok((root.into_owned(), policy))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed(String),
}

/// Counted completion barrier over asset loads.
///
/// Each id settles at most once, failures included. `on_ready` runs exactly
/// once, when the settled count reaches the expected count.
pub struct LoadBarrier<F: FnOnce()> {
    expected: usize,
    settled: HashSet<String>,
    on_ready: Option<F>,
}

impl<F: FnOnce()> LoadBarrier<F> {
    pub fn new(expected: usize, on_ready: F) -> Self {
        let mut barrier = Self {
            expected,
            settled: HashSet::new(),
            on_ready: Some(on_ready),
        };
        barrier.release_if_done();
        barrier
    }

    /// Records the outcome for `id`. Returns true when this call released
    /// the barrier.
    pub fn settle(&mut self, id: &str, outcome: LoadOutcome) -> bool {
        if self.is_ready() {
            log::warn!("asset `{id}` settled after the barrier was released");
            return false;
        }
        if !self.settled.insert(id.to_string()) {
            log::warn!("asset `{id}` settled twice; ignoring");
            return false;
        }
        if let LoadOutcome::Failed(reason) = &outcome {
            log::warn!("asset `{id}` failed to load: {reason}");
        }
        self.release_if_done()
    }

    pub fn settled(&self) -> usize {
        self.settled.len()
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_ready(&self) -> bool {
        self.on_ready.is_none()
    }

    fn release_if_done(&mut self) -> bool {
        if self.settled.len() < self.expected {
            return false;
        }
        match self.on_ready.take() {
            Some(on_ready) => {
                on_ready();
                true
            }
            None => false,
        }
    }
}

/// Resolves a photo reference to something the renderer can embed.
pub trait AssetLoader {
    fn load(&mut self, reference: &str) -> std::result::Result<String, String>;
}

/// Accepts a reference when the file exists under `base`. The reference is
/// kept as written so the SVG stays relative.
pub struct FsAssetLoader {
    base: PathBuf,
}

impl FsAssetLoader {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }
}

impl AssetLoader for FsAssetLoader {
    fn load(&mut self, reference: &str) -> std::result::Result<String, String> {
        let path = self.base.join(reference);
        if path.is_file() {
            Ok(reference.to_string())
        } else {
            Err(format!("{} is not a readable file", path.display()))
        }
    }
}

/// Hands every reference through unchecked; the viewer resolves it.
pub struct PassThroughLoader;

impl AssetLoader for PassThroughLoader {
    fn load(&mut self, reference: &str) -> std::result::Result<String, String> {
        Ok(reference.to_string())
    }
}
