use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Vertical distance between generation rows.
    pub row_height: f32,
    /// Horizontal clearance added on each side of a person box when
    /// resolving collisions.
    pub box_padding: f32,
    /// Distance between the drawing's top-left content edge and the origin.
    pub margin: f32,
    /// Lets sibling subtrees interleave when no box actually overlaps.
    pub sibling_overlay: bool,
    pub node_padding_x: f32,
    pub node_padding_y: f32,
    pub label_line_height: f32,
    pub max_note_width_chars: usize,
    pub fast_text_metrics: bool,
    pub photo_width: f32,
    pub photo_height: f32,
    pub photo_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_height: 150.0,
            box_padding: 10.0,
            margin: 20.0,
            sibling_overlay: true,
            node_padding_x: 12.0,
            node_padding_y: 8.0,
            label_line_height: 1.4,
            max_note_width_chars: 28,
            fast_text_metrics: true,
            photo_width: 48.0,
            photo_height: 60.0,
            photo_gap: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    primary_color: Option<String>,
    primary_text_color: Option<String>,
    primary_border_color: Option<String>,
    secondary_text_color: Option<String>,
    root_color: Option<String>,
    root_border_color: Option<String>,
    placeholder_color: Option<String>,
    line_color: Option<String>,
    union_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    row_height: Option<f32>,
    box_padding: Option<f32>,
    margin: Option<f32>,
    sibling_overlay: Option<bool>,
    node_padding_x: Option<f32>,
    node_padding_y: Option<f32>,
    label_line_height: Option<f32>,
    max_note_width_chars: Option<usize>,
    fast_text_metrics: Option<bool>,
    photo_width: Option<f32>,
    photo_height: Option<f32>,
    photo_gap: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    let mut config = Config::default();

    match parsed.theme.as_deref() {
        None | Some("default") | Some("classic") => {}
        Some("modern") => config.theme = Theme::modern(),
        Some(other) => return Err(anyhow::anyhow!("unknown theme `{other}`")),
    }
    config.render.background = config.theme.background.clone();

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        overlay(&mut theme.font_family, vars.font_family);
        overlay(&mut theme.font_size, vars.font_size);
        overlay(&mut theme.primary_color, vars.primary_color);
        overlay(&mut theme.primary_text_color, vars.primary_text_color);
        overlay(&mut theme.primary_border_color, vars.primary_border_color);
        overlay(&mut theme.secondary_text_color, vars.secondary_text_color);
        overlay(&mut theme.root_color, vars.root_color);
        overlay(&mut theme.root_border_color, vars.root_border_color);
        overlay(&mut theme.placeholder_color, vars.placeholder_color);
        overlay(&mut theme.line_color, vars.line_color);
        overlay(&mut theme.union_color, vars.union_color);
        if let Some(background) = vars.background {
            theme.background = background.clone();
            config.render.background = background;
        }
    }

    if let Some(file) = parsed.layout {
        let layout = &mut config.layout;
        overlay(&mut layout.row_height, file.row_height);
        overlay(&mut layout.box_padding, file.box_padding);
        overlay(&mut layout.margin, file.margin);
        overlay(&mut layout.sibling_overlay, file.sibling_overlay);
        overlay(&mut layout.node_padding_x, file.node_padding_x);
        overlay(&mut layout.node_padding_y, file.node_padding_y);
        overlay(&mut layout.label_line_height, file.label_line_height);
        overlay(&mut layout.max_note_width_chars, file.max_note_width_chars);
        overlay(&mut layout.fast_text_metrics, file.fast_text_metrics);
        overlay(&mut layout.photo_width, file.photo_width);
        overlay(&mut layout.photo_height, file.photo_height);
        overlay(&mut layout.photo_gap, file.photo_gap);
    }

    if let Some(file) = parsed.render {
        overlay(&mut config.render.width, file.width);
        overlay(&mut config.render.height, file.height);
        overlay(&mut config.render.background, file.background);
    }

    if config.layout.row_height <= 0.0 {
        return Err(anyhow::anyhow!("layout.rowHeight must be positive"));
    }
    Ok(config)
}

fn overlay<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}
