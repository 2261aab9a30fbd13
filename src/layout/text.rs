use crate::config::LayoutConfig;
use crate::text_metrics;
use crate::theme::Theme;

use super::TextBlock;

/// Measures a label made of several logical lines. Lines listed in `wrap`
/// are broken at word boundaries to the configured note width.
pub(crate) fn measure_lines(
    lines: &[(String, bool)],
    font_size: f32,
    theme: &Theme,
    config: &LayoutConfig,
) -> TextBlock {
    let fast = config.fast_text_metrics;
    let family = theme.font_family.as_str();
    let max_width = config.max_note_width_chars.max(1) as f32
        * average_char_width(family, font_size, fast);

    let mut out = Vec::new();
    for (line, wrap) in lines {
        let line = line.trim();
        if *wrap {
            out.extend(wrap_line(line, max_width, font_size, family, fast));
        } else {
            out.push(line.to_string());
        }
    }
    if out.is_empty() {
        out.push(String::new());
    }

    let width = out
        .iter()
        .map(|line| text_width(line, font_size, family, fast))
        .fold(0.0, f32::max);
    let height = out.len() as f32 * font_size * config.label_line_height;
    TextBlock {
        lines: out,
        width,
        height,
    }
}

fn char_width_factor(ch: char) -> f32 {
    // Em fractions for a typical humanist sans at regular weight.
    match ch {
        ' ' => 0.306,
        '.' | ',' | ':' | ';' | '!' | '|' | '\'' => 0.28,
        '(' | ')' | '[' | ']' | '-' => 0.34,
        'i' | 'j' | 'l' | 'I' => 0.24,
        'f' | 't' | 'r' => 0.35,
        'm' | 'w' => 0.84,
        'M' | 'W' => 0.93,
        '?' => 0.5,
        '0'..='9' => 0.6,
        'A'..='Z' => 0.67,
        'a'..='z' => 0.56,
        _ => 0.6,
    }
}

pub(crate) fn wrap_line(
    line: &str,
    max_width: f32,
    font_size: f32,
    font_family: &str,
    fast_metrics: bool,
) -> Vec<String> {
    if text_width(line, font_size, font_family, fast_metrics) <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font_size, font_family, fast_metrics) > max_width
            && !current.is_empty()
        {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(crate) fn text_width(text: &str, font_size: f32, font_family: &str, fast_metrics: bool) -> f32 {
    if fast_metrics && text.is_ascii() {
        return fallback_text_width(text, font_size);
    }
    text_metrics::measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

fn average_char_width(font_family: &str, font_size: f32, fast_metrics: bool) -> f32 {
    if fast_metrics {
        return font_size * 0.56;
    }
    text_metrics::average_char_width(font_family, font_size).unwrap_or(font_size * 0.56)
}
