use crate::config::LayoutConfig;
use crate::error::{FamilyError, Result};
use crate::graph::FamilyGraph;
use crate::layout::FamilyLayout;
use crate::parser::parse_records;
use crate::render::{person_footprint, render_svg};
use crate::session::{
    AssetLoader, FsAssetLoader, LoadBarrier, LoadOutcome, LoadedAssets, PassThroughLoader, Session,
};
use crate::theme::Theme;
use crate::validate::validate;
use crate::visibility::VisibilityPolicy;
use std::cell::Cell;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub theme: Theme,
    pub layout: LayoutConfig,
    /// Defaults to the first person defined in the file.
    pub root: Option<String>,
    pub policy: VisibilityPolicy,
    /// Directory photo references are resolved against. Without one, photo
    /// references are embedded unchecked.
    pub asset_dir: Option<PathBuf>,
}

impl RenderOptions {
    pub fn modern() -> Self {
        Self {
            theme: Theme::modern(),
            ..Default::default()
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_policy(mut self, policy: VisibilityPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RenderedFamily {
    pub graph: FamilyGraph,
    pub session: Session,
    pub layout: FamilyLayout,
    pub assets: LoadedAssets,
    pub svg: String,
}

/// Parses, builds and validates a family file.
pub fn load_family(input: &str) -> Result<FamilyGraph> {
    let records = parse_records(input)?;
    let graph = FamilyGraph::build(&records)?;
    validate(&graph)?;
    Ok(graph)
}

/// Full render: a speculative layout without photos, photo loads through a
/// completion barrier, then a fresh layout with final footprints.
pub fn render_family(
    input: &str,
    options: &RenderOptions,
    loader: &mut dyn AssetLoader,
) -> Result<RenderedFamily> {
    let graph = load_family(input)?;
    let root = match options.root.as_deref() {
        Some(root) => root.to_string(),
        None => graph
            .first_person()
            .map(|id| graph.name(id).to_string())
            .ok_or(FamilyError::NoPersons)?,
    };
    let session = Session::new(&graph, &root, options.policy)?;
    let (theme, config) = (&options.theme, &options.layout);

    let speculative = session.layout(
        &graph,
        |person| person_footprint(person, false, theme, config),
        config,
    )?;

    let pending: Vec<_> = speculative
        .footprints
        .keys()
        .filter_map(|id| {
            let photo = graph.person(*id)?.photo.as_deref()?;
            Some((*id, photo))
        })
        .collect();
    let ready = Cell::new(false);
    let mut assets = LoadedAssets::new();
    {
        let mut barrier = LoadBarrier::new(pending.len(), || ready.set(true));
        for (id, photo) in pending {
            let outcome = match loader.load(photo) {
                Ok(href) => {
                    assets.insert(id, href);
                    LoadOutcome::Loaded
                }
                Err(reason) => LoadOutcome::Failed(reason),
            };
            barrier.settle(graph.name(id), outcome);
        }
    }

    let layout = if ready.get() && !assets.is_empty() {
        session.layout(
            &graph,
            |person| {
                let with_photo = graph
                    .lookup(&person.key)
                    .is_some_and(|id| assets.contains_key(&id));
                person_footprint(person, with_photo, theme, config)
            },
            config,
        )?
    } else {
        speculative
    };

    let svg = render_svg(&graph, &layout, session.policy(), &assets, theme, config);
    Ok(RenderedFamily {
        graph,
        session,
        layout,
        assets,
        svg,
    })
}

pub fn render_with_options(input: &str, options: &RenderOptions) -> Result<String> {
    let rendered = match &options.asset_dir {
        Some(dir) => render_family(input, options, &mut FsAssetLoader::new(dir))?,
        None => render_family(input, options, &mut PassThroughLoader)?,
    };
    Ok(rendered.svg)
}

pub fn render(input: &str) -> Result<String> {
    render_with_options(input, &RenderOptions::default())
}
