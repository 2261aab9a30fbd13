use family_tree_renderer::visibility::VisibilityPolicy;
use family_tree_renderer::{RenderOptions, render_with_options};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FamilyRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    root: Option<String>,
    detail: Option<String>,
    row_height: Option<f32>,
}

fn build_render_options(options: FamilyRenderOptions) -> Result<RenderOptions, String> {
    let mut render_options = if options.theme.as_deref() == Some("modern") {
        RenderOptions::modern()
    } else {
        RenderOptions::default()
    };

    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        render_options.theme.font_size = font_size;
    }
    if let Some(row_height) = options.row_height {
        render_options.layout.row_height = row_height;
    }
    if let Some(detail) = options.detail {
        render_options.policy =
            VisibilityPolicy::from_token(&detail).map_err(|error| error.to_string())?;
    }
    render_options.root = options.root;
    Ok(render_options)
}

/// Renders `code` to SVG. `options_json` may carry `theme`, `fontFamily`,
/// `fontSize`, `root`, `detail` and `rowHeight`.
#[wasm_bindgen]
pub fn render_family_svg(code: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<FamilyRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        FamilyRenderOptions::default()
    };

    let render_options = build_render_options(options).map_err(|error| JsValue::from_str(&error))?;
    render_with_options(code, &render_options).map_err(|error| JsValue::from_str(&error.to_string()))
}
