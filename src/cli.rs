use crate::config::load_config;
use crate::layout_dump::write_layout_dump;
use crate::pipeline::{RenderOptions, render_family};
use crate::render::{write_output_png, write_output_svg};
use crate::session::FsAssetLoader;
use crate::visibility::VisibilityPolicy;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "famtree", version, about = "Family tree renderer")]
pub struct Args {
    /// Input family file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, layout, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Person to center the tree on. Defaults to the first person in the file.
    #[arg(short = 'r', long = "root")]
    pub root: Option<String>,

    /// Detail level: 1, 2, ..., inf or all
    #[arg(short = 'd', long = "detail", default_value = "2")]
    pub detail: String,

    /// Log each phase to stderr
    #[arg(long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let policy = VisibilityPolicy::from_token(&args.detail)?;
    let input = read_input(args.input.as_deref())?;
    let asset_dir = asset_dir(args.input.as_deref());

    let options = RenderOptions {
        theme: config.theme.clone(),
        layout: config.layout.clone(),
        root: args.root.clone(),
        policy,
        asset_dir: Some(asset_dir.clone()),
    };
    let rendered = render_family(&input, &options, &mut FsAssetLoader::new(&asset_dir))?;

    match args.output_format {
        OutputFormat::Svg => write_output_svg(&rendered.svg, args.output.as_deref())?,
        OutputFormat::Png => {
            let output = args
                .output
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Output path required for png output"))?;
            write_output_png(&rendered.svg, output, &config.render, Some(&asset_dir))?;
        }
        OutputFormat::Json => write_layout_dump(
            args.output.as_deref(),
            &rendered.layout,
            &rendered.graph,
            rendered.session.policy(),
        )?,
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Photos are looked up next to the input file, or in the working
/// directory for stdin.
fn asset_dir(input: Option<&Path>) -> PathBuf {
    input
        .filter(|path| *path != Path::new("-"))
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."))
}
