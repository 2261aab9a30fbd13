#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod session;
pub(crate) mod text_metrics;
pub mod theme;
pub mod validate;
pub mod visibility;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{FamilyError, Result};
pub use pipeline::{RenderOptions, RenderedFamily, load_family, render, render_family, render_with_options};
