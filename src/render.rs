use crate::config::{LayoutConfig, RenderConfig};
use crate::graph::{FamilyGraph, NodeId, Person};
use crate::layout::text::measure_lines;
use crate::layout::{FamilyLayout, Footprint, TextBlock};
use crate::session::{LoadedAssets, fragment};
use crate::theme::Theme;
use crate::visibility::VisibilityPolicy;
use anyhow::Result;
use std::path::Path;

const UNION_RADIUS: f32 = 3.5;

/// Text lines of a person box: name, lifespan, then wrapped notes.
pub fn person_label(person: &Person, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    let mut lines = vec![(person.display_name().to_string(), false)];
    if let Some(lifespan) = person.lifespan.as_ref().and_then(|lifespan| lifespan.label()) {
        lines.push((lifespan, false));
    }
    lines.extend(person.notes.iter().map(|note| (note.clone(), true)));
    measure_lines(&lines, theme.font_size, theme, config)
}

/// On-screen size of a person box. `with_photo` reserves room for a
/// portrait beside the text.
pub fn person_footprint(
    person: &Person,
    with_photo: bool,
    theme: &Theme,
    config: &LayoutConfig,
) -> Footprint {
    let label = person_label(person, theme, config);
    let (mut width, mut height) = (label.width, label.height);
    if with_photo {
        width += config.photo_width + config.photo_gap;
        height = height.max(config.photo_height);
    }
    Footprint::new(
        width + 2.0 * config.node_padding_x,
        height + 2.0 * config.node_padding_y,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    Partner,
    Descent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub kind: ConnectorKind,
    pub points: Vec<(f32, f32)>,
}

/// Line segments joining partners to their union anchor and the anchor to
/// each rendered child through a horizontal bus.
///
/// Partner lines drop from the bottom of each box and run at the anchor's
/// height, below the row. A childless anchor shares the row, so its lines
/// stay flat unless another box sits in the way.
pub fn connectors(graph: &FamilyGraph, layout: &FamilyLayout) -> Vec<Connector> {
    let mut out = Vec::new();
    for union in graph.unions().filter(|id| layout.contains(*id)) {
        let Some(anchor) = layout.position(union) else {
            continue;
        };
        let members: Vec<NodeId> = graph.members(union).into_iter().flatten().collect();
        for &member in &members {
            let (Some(point), Some((left, _, right, bottom))) =
                (layout.position(member), layout.bounds(member))
            else {
                continue;
            };
            let points = if anchor.y > bottom {
                vec![(point.x, bottom), (point.x, anchor.y), (anchor.x, anchor.y)]
            } else {
                let edge = if point.x <= anchor.x { right } else { left };
                if row_blocked(layout, &members, point.y, edge, anchor.x) {
                    let lane = row_bottom(layout, point.y) + 2.0 * UNION_RADIUS;
                    vec![
                        (point.x, bottom),
                        (point.x, lane),
                        (anchor.x, lane),
                        (anchor.x, anchor.y),
                    ]
                } else {
                    vec![(edge, point.y), (anchor.x, point.y)]
                }
            };
            out.push(Connector {
                kind: ConnectorKind::Partner,
                points,
            });
        }

        let children: Vec<(f32, f32)> = graph
            .children_of(union)
            .iter()
            .filter_map(|child| {
                let point = layout.position(*child)?;
                let (_, top, _, _) = layout.bounds(*child)?;
                Some((point.x, top))
            })
            .collect();
        let Some(children_top) = children.iter().map(|(_, top)| *top).reduce(f32::min) else {
            continue;
        };
        let bus_y = (anchor.y + children_top) / 2.0;
        let (min_x, max_x) = children
            .iter()
            .fold((anchor.x, anchor.x), |(min, max), (x, _)| (min.min(*x), max.max(*x)));
        out.push(Connector {
            kind: ConnectorKind::Descent,
            points: vec![(anchor.x, anchor.y), (anchor.x, bus_y)],
        });
        if max_x - min_x > f32::EPSILON {
            out.push(Connector {
                kind: ConnectorKind::Descent,
                points: vec![(min_x, bus_y), (max_x, bus_y)],
            });
        }
        for (x, top) in children {
            out.push(Connector {
                kind: ConnectorKind::Descent,
                points: vec![(x, bus_y), (x, top)],
            });
        }
    }
    out
}

/// Whether a box other than `skip` straddles height `y` between `x0` and `x1`.
fn row_blocked(layout: &FamilyLayout, skip: &[NodeId], y: f32, x0: f32, x1: f32) -> bool {
    let (from, to) = (x0.min(x1), x0.max(x1));
    layout.footprints.keys().filter(|id| !skip.contains(*id)).any(|id| {
        layout.bounds(*id).is_some_and(|(left, top, right, bottom)| {
            top < y && y < bottom && left < to && right > from
        })
    })
}

/// Lowest box edge among the boxes crossing height `y`.
fn row_bottom(layout: &FamilyLayout, y: f32) -> f32 {
    layout
        .footprints
        .keys()
        .filter_map(|id| layout.bounds(*id))
        .filter(|(_, top, _, bottom)| *top <= y && y <= *bottom)
        .map(|(_, _, _, bottom)| bottom)
        .fold(y, f32::max)
}

/// Draws the family. Every person box links to the fragment that re-roots
/// the view on that person under `policy`.
pub fn render_svg(
    graph: &FamilyGraph,
    layout: &FamilyLayout,
    policy: VisibilityPolicy,
    assets: &LoadedAssets,
    theme: &Theme,
    config: &LayoutConfig,
) -> String {
    let mut svg = String::new();
    let width = layout.width.max(200.0);
    let height = layout.height.max(120.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<g class=\"connectors\">");
    for connector in connectors(graph, layout) {
        svg.push_str(&format!(
            "<path class=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\"/>",
            match connector.kind {
                ConnectorKind::Partner => "partner",
                ConnectorKind::Descent => "descent",
            },
            points_to_path(&connector.points),
            theme.line_color
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"unions\">");
    for union in graph.unions() {
        let Some(point) = layout.position(union) else {
            continue;
        };
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{UNION_RADIUS}\" fill=\"{}\">",
            point.x, point.y, theme.union_color
        ));
        if let Some(info) = graph.union(union) {
            let mut title = graph.display_name(union);
            if let Some(years) = info.lifespan.as_ref().and_then(|lifespan| lifespan.label()) {
                title.push_str(&format!(" ({years})"));
            }
            for note in &info.notes {
                title.push('\n');
                title.push_str(note);
            }
            svg.push_str(&format!("<title>{}</title>", escape_xml(&title)));
        }
        svg.push_str("</circle>");
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"persons\">");
    for id in graph.persons() {
        let Some(person) = graph.person(id) else {
            continue;
        };
        let Some(bounds) = layout.bounds(id) else {
            continue;
        };
        svg.push_str(&person_svg(
            graph, layout, id, person, bounds, policy, assets, theme, config,
        ));
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

#[allow(clippy::too_many_arguments)]
fn person_svg(
    graph: &FamilyGraph,
    layout: &FamilyLayout,
    id: NodeId,
    person: &Person,
    (left, top, right, bottom): (f32, f32, f32, f32),
    policy: VisibilityPolicy,
    assets: &LoadedAssets,
    theme: &Theme,
    config: &LayoutConfig,
) -> String {
    let is_root = id == layout.root;
    let (fill, stroke) = if is_root {
        (theme.root_color.as_str(), theme.root_border_color.as_str())
    } else if person.is_placeholder() {
        (theme.placeholder_color.as_str(), theme.primary_border_color.as_str())
    } else {
        (theme.primary_color.as_str(), theme.primary_border_color.as_str())
    };
    let dash = if person.is_placeholder() {
        " stroke-dasharray=\"4 3\""
    } else {
        ""
    };

    let mut out = format!(
        "<a href=\"#{}\" xlink:href=\"#{}\">",
        escape_xml(&fragment(&graph.link_key(id), policy)),
        escape_xml(&fragment(&graph.link_key(id), policy)),
    );
    out.push_str(&format!(
        "<rect x=\"{left:.2}\" y=\"{top:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{}\"{dash}/>",
        right - left,
        bottom - top,
        if is_root { 2.2 } else { 1.4 },
    ));

    let mut text_left = left + config.node_padding_x;
    if let Some(href) = assets.get(&id) {
        let photo_y = (top + bottom - config.photo_height) / 2.0;
        out.push_str(&format!(
            "<image x=\"{text_left:.2}\" y=\"{photo_y:.2}\" width=\"{:.2}\" height=\"{:.2}\" href=\"{}\" preserveAspectRatio=\"xMidYMid slice\"/>",
            config.photo_width,
            config.photo_height,
            escape_xml(href)
        ));
        text_left += config.photo_width + config.photo_gap;
    }

    let label = person_label(person, theme, config);
    let center_x = (text_left + right - config.node_padding_x) / 2.0;
    out.push_str(&text_block_svg(center_x, (top + bottom) / 2.0, &label, theme, config));
    out.push_str("</a>");
    out
}

fn text_block_svg(x: f32, y: f32, label: &TextBlock, theme: &Theme, config: &LayoutConfig) -> String {
    let line_height = theme.font_size * config.label_line_height;
    let start_y = y - label.height / 2.0 + theme.font_size;
    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        escape_xml(&theme.font_family),
        theme.font_size,
        theme.primary_text_color
    );
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        let fill = if idx == 0 {
            String::new()
        } else {
            format!(" fill=\"{}\"", theme.secondary_text_color)
        };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\"{fill}>{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let mut d = String::new();
    for (idx, (x, y)) in points.iter().enumerate() {
        let op = if idx == 0 { "M" } else { " L" };
        d.push_str(&format!("{op} {x:.2} {y:.2}"));
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, svg)?,
        None => print!("{svg}"),
    }
    Ok(())
}

/// Rasterizes `svg`. Relative photo references resolve against
/// `resources_dir`.
#[cfg(feature = "png")]
pub fn write_output_png(
    svg: &str,
    output: &Path,
    render_cfg: &RenderConfig,
    resources_dir: Option<&Path>,
) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.resources_dir = resources_dir.map(Path::to_path_buf);
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::default(),
        &mut pixmap.as_mut(),
    );
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(
    _svg: &str,
    _output: &Path,
    _render_cfg: &RenderConfig,
    _resources_dir: Option<&Path>,
) -> Result<()> {
    Err(anyhow::anyhow!(
        "PNG output requires the `png` feature"
    ))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_family_layout;
    use crate::parser::parse_records;
    use crate::visibility::compute_visible;

    fn family(input: &str, root: &str) -> (FamilyGraph, FamilyLayout) {
        family_with(input, root, VisibilityPolicy::unbounded())
    }

    fn family_with(
        input: &str,
        root: &str,
        policy: VisibilityPolicy,
    ) -> (FamilyGraph, FamilyLayout) {
        let graph = FamilyGraph::build(&parse_records(input).unwrap()).unwrap();
        let root = graph.require(root).unwrap();
        let visible = compute_visible(&graph, root, policy);
        let theme = Theme::classic();
        let config = LayoutConfig::default();
        let layout = compute_family_layout(
            &graph,
            root,
            &visible,
            |person| person_footprint(person, false, &theme, &config),
            &config,
        )
        .unwrap();
        (graph, layout)
    }

    #[test]
    fn photo_widens_and_heightens_box() {
        let person = Person {
            key: "Ada".into(),
            defined: true,
            ..Person::default()
        };
        let theme = Theme::classic();
        let config = LayoutConfig::default();
        let plain = person_footprint(&person, false, &theme, &config);
        let framed = person_footprint(&person, true, &theme, &config);
        assert!((framed.width - plain.width - config.photo_width - config.photo_gap).abs() < 0.01);
        assert!(framed.height >= config.photo_height);
    }

    #[test]
    fn connectors_join_partners_and_children() {
        let (graph, layout) = family("Alice\nBob\nAlice + Bob\n  c: Carol, Dan\nCarol\nDan\n", "Alice");
        let lines = connectors(&graph, &layout);
        let partners = lines
            .iter()
            .filter(|c| c.kind == ConnectorKind::Partner)
            .count();
        let descent = lines
            .iter()
            .filter(|c| c.kind == ConnectorKind::Descent)
            .count();
        assert_eq!(partners, 2);
        // stem, bus and one drop per child
        assert_eq!(descent, 4);

        let carol = layout.bounds(graph.require("Carol").unwrap()).unwrap();
        assert!(lines.iter().any(|c| c.points.last() == Some(&(layout.position(graph.require("Carol").unwrap()).unwrap().x, carol.1))));
    }

    #[test]
    fn childless_union_gets_flat_partner_lines() {
        let (graph, layout) = family("Alice\nBob\nAlice + Bob\n", "Alice");
        for connector in connectors(&graph, &layout) {
            assert_eq!(connector.kind, ConnectorKind::Partner);
            assert_eq!(connector.points.len(), 2);
            assert_eq!(connector.points[0].1, connector.points[1].1);
        }
    }

    #[test]
    fn svg_links_each_person_and_escapes_text() {
        let (graph, layout) = family("Anna <Ann>\nBo & Co\nAnna <Ann> + Bo & Co\n  c: ?\n", "Anna <Ann>");
        let svg = render_svg(
            &graph,
            &layout,
            VisibilityPolicy::levels(3),
            &LoadedAssets::new(),
            &Theme::classic(),
            &LayoutConfig::default(),
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Anna &lt;Ann&gt;"));
        assert!(svg.contains("Bo &amp; Co"));
        assert!(svg.contains("href=\"#Anna%20%3CAnn%3E:3\""));
        assert!(svg.contains(&Theme::classic().root_color));
        assert!(svg.contains("stroke-dasharray"));
        assert!(!svg.contains("?,"));
        assert_eq!(svg.matches("<circle").count(), 1);
    }

    /// Whether an axis-aligned segment runs through the inside of a box.
    fn cuts_box(a: (f32, f32), b: (f32, f32), (left, top, right, bottom): (f32, f32, f32, f32)) -> bool {
        let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
        let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
        x0 < right - 0.01 && x1 > left + 0.01 && y0 < bottom - 0.01 && y1 > top + 0.01
    }

    #[test]
    fn partner_lines_pass_clear_of_siblings() {
        let input = "Gpa\nGma\nGpa + Gma\n  c: Alice, Uncle\nAlice\nUncle\nBob\nAlice + Bob\n  c: Carol\nCarol\n";
        for root in ["Carol", "Alice", "Uncle", "Bob", "Gpa"] {
            for policy in [VisibilityPolicy::levels(1), VisibilityPolicy::everyone()] {
                let (graph, layout) = family_with(input, root, policy);
                for union in graph.unions().filter(|id| layout.contains(*id)) {
                    let members: Vec<NodeId> = graph.members(union).into_iter().flatten().collect();
                    let others: Vec<_> = layout
                        .footprints
                        .keys()
                        .filter(|id| !members.contains(*id))
                        .filter_map(|id| layout.bounds(*id).map(|bounds| (*id, bounds)))
                        .collect();
                    let anchor = layout.position(union).unwrap();
                    let partner_lines: Vec<Connector> = connectors(&graph, &layout)
                        .into_iter()
                        .filter(|c| c.kind == ConnectorKind::Partner)
                        .filter(|c| c.points.last() == Some(&(anchor.x, anchor.y)))
                        .collect();
                    for line in &partner_lines {
                        for pair in line.points.windows(2) {
                            for (other, bounds) in &others {
                                assert!(
                                    !cuts_box(pair[0], pair[1], *bounds),
                                    "root={root} detail={policy}: partner line {:?} crosses `{}`",
                                    line.points,
                                    graph.name(*other)
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}
