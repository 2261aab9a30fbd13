use crate::graph::FamilyGraph;
use crate::layout::FamilyLayout;
use crate::render::{ConnectorKind, connectors};
use crate::visibility::VisibilityPolicy;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub root: String,
    pub detail: String,
    pub width: f32,
    pub height: f32,
    pub persons: Vec<PersonDump>,
    pub unions: Vec<UnionDump>,
    pub connectors: Vec<ConnectorDump>,
}

#[derive(Debug, Serialize)]
pub struct PersonDump {
    pub id: String,
    pub label: String,
    pub generation: i32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct UnionDump {
    pub id: String,
    pub left: String,
    pub right: String,
    pub children: Vec<String>,
    pub generation: i32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Serialize)]
pub struct ConnectorDump {
    pub kind: String,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &FamilyLayout, graph: &FamilyGraph, policy: VisibilityPolicy) -> Self {
        let mut persons = Vec::new();
        let mut unions = Vec::new();
        for (id, point) in &layout.positions {
            let generation = layout.local.get(id).map_or(0, |local| local.generation);
            if let Some(union) = graph.union(*id) {
                unions.push(UnionDump {
                    id: graph.name(*id).to_string(),
                    left: graph.name(union.left).to_string(),
                    right: graph.name(union.right).to_string(),
                    children: union
                        .children
                        .iter()
                        .filter(|child| layout.contains(**child))
                        .map(|child| graph.name(*child).to_string())
                        .collect(),
                    generation,
                    x: point.x,
                    y: point.y,
                });
            } else {
                let footprint = layout.footprints.get(id).copied().unwrap_or_default();
                persons.push(PersonDump {
                    id: graph.name(*id).to_string(),
                    label: graph.display_name(*id),
                    generation,
                    x: point.x,
                    y: point.y,
                    width: footprint.width,
                    height: footprint.height,
                });
            }
        }

        let connectors = connectors(graph, layout)
            .into_iter()
            .map(|connector| ConnectorDump {
                kind: match connector.kind {
                    ConnectorKind::Partner => "partner",
                    ConnectorKind::Descent => "descent",
                }
                .to_string(),
                points: connector.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            root: graph.name(layout.root).to_string(),
            detail: policy.token(),
            width: layout.width,
            height: layout.height,
            persons,
            unions,
            connectors,
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or stdout when `None`.
pub fn write_layout_dump(
    path: Option<&Path>,
    layout: &FamilyLayout,
    graph: &FamilyGraph,
    policy: VisibilityPolicy,
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, graph, policy);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RenderOptions, render_family};
    use crate::session::PassThroughLoader;

    #[test]
    fn dump_lists_persons_unions_and_lines() {
        let rendered = render_family(
            "Alice\nBob\nAlice + Bob\n  c: Carol\nCarol\n",
            &RenderOptions::default().with_root("Carol"),
            &mut PassThroughLoader,
        )
        .unwrap();
        let dump = LayoutDump::from_layout(&rendered.layout, &rendered.graph, rendered.session.policy());
        assert_eq!(dump.root, "Carol");
        assert_eq!(dump.detail, "2");
        assert_eq!(dump.persons.len(), 3);
        assert_eq!(dump.unions.len(), 1);
        assert_eq!(dump.unions[0].children, vec!["Carol"]);
        assert_eq!(dump.unions[0].generation, -1);

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["persons"].as_array().unwrap().len(), 3);
        assert!(json["connectors"].as_array().unwrap().len() >= 3);
    }
}
