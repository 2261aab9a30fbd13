use crate::error::{FamilyError, Result};
use crate::graph::{FamilyGraph, NodeId};

/// Checks that the graph is a single tree whose every node was defined.
///
/// Runs a depth-first walk that records each node's discovery parent. A
/// neighbor that is already discovered and is not the parent closes a
/// cycle, which is reported by walking the parent chain back to it.
pub fn validate(graph: &FamilyGraph) -> Result<()> {
    let mut parent: Vec<Option<NodeId>> = vec![None; graph.len()];
    let mut discovered = vec![false; graph.len()];
    let mut components: Vec<(NodeId, usize)> = Vec::new();

    for start in graph.ids() {
        if discovered[start.index()] {
            continue;
        }
        discovered[start.index()] = true;
        let mut size = 1usize;
        // (node, next neighbor position)
        let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];

        while let Some(&(node, cursor)) = stack.last() {
            let Some(&next) = graph.neighbors(node).get(cursor) else {
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            if parent[node.index()] == Some(next) {
                continue;
            }
            if discovered[next.index()] {
                return Err(FamilyError::Cycle {
                    path: describe_cycle(graph, &parent, node, next),
                });
            }
            discovered[next.index()] = true;
            parent[next.index()] = Some(node);
            size += 1;
            stack.push((next, 0));
        }
        components.push((start, size));
    }

    if components.len() > 1 {
        let summary = components
            .iter()
            .map(|(representative, size)| {
                format!(
                    "`{}` ({} {})",
                    graph.display_name(*representative),
                    size,
                    if *size == 1 { "node" } else { "nodes" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        return Err(FamilyError::MultipleComponents {
            count: components.len(),
            summary,
        });
    }

    for id in graph.persons() {
        let Some(person) = graph.person(id) else {
            continue;
        };
        if !person.defined {
            let referenced_by = graph
                .neighbors(id)
                .first()
                .map(|union| graph.display_name(*union))
                .unwrap_or_default();
            return Err(FamilyError::DanglingReference {
                name: person.display_name().to_string(),
                referenced_by,
            });
        }
    }

    log::debug!("family graph validated: {} nodes in one tree", graph.len());
    Ok(())
}

fn describe_cycle(
    graph: &FamilyGraph,
    parent: &[Option<NodeId>],
    from: NodeId,
    repeated: NodeId,
) -> String {
    let mut chain = vec![from];
    let mut cursor = from;
    while cursor != repeated {
        match parent[cursor.index()] {
            Some(up) => {
                chain.push(up);
                cursor = up;
            }
            None => break,
        }
    }
    chain.reverse();
    chain.push(repeated);
    chain
        .iter()
        .map(|id| graph.display_name(*id))
        .collect::<Vec<_>>()
        .join(" -> ")
}
