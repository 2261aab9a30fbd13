use std::collections::BTreeSet;
use std::path::Path;

use family_tree_renderer::config::LayoutConfig;
use family_tree_renderer::graph::{FamilyGraph, NodeId};
use family_tree_renderer::layout::{FamilyLayout, compute_family_layout};
use family_tree_renderer::render::person_footprint;
use family_tree_renderer::theme::Theme;
use family_tree_renderer::visibility::{VisibilityPolicy, compute_visible};
use family_tree_renderer::{FamilyError, load_family, render};

const EPSILON: f32 = 1e-3;

// Keep this list explicit so new fixtures must be added intentionally.
const FIXTURES: [&str; 5] = [
    "simple.fam",
    "remarriage.fam",
    "placeholders.fam",
    "extended.fam",
    "wide.fam",
];

fn policies() -> [VisibilityPolicy; 5] {
    [
        VisibilityPolicy::levels(0),
        VisibilityPolicy::levels(1),
        VisibilityPolicy::levels(2),
        VisibilityPolicy::unbounded(),
        VisibilityPolicy::everyone(),
    ]
}

fn load_fixture(name: &str) -> FamilyGraph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    assert!(path.exists(), "fixture missing: {name}");
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    load_family(&input).unwrap_or_else(|err| panic!("{name}: {err}"))
}

fn lay_out(graph: &FamilyGraph, root: NodeId, policy: VisibilityPolicy) -> FamilyLayout {
    let theme = Theme::classic();
    let config = LayoutConfig::default();
    let visible = compute_visible(graph, root, policy);
    compute_family_layout(
        graph,
        root,
        &visible,
        |person| person_footprint(person, false, &theme, &config),
        &config,
    )
    .unwrap_or_else(|err| panic!("root {}: {err}", graph.name(root)))
}

fn assert_no_overlap(graph: &FamilyGraph, layout: &FamilyLayout, context: &str) {
    let padding = LayoutConfig::default().box_padding;
    let persons: Vec<NodeId> = layout.footprints.keys().copied().collect();
    for (i, a) in persons.iter().enumerate() {
        for b in &persons[i + 1..] {
            if layout.local[a].generation != layout.local[b].generation {
                continue;
            }
            let needed =
                (layout.footprints[a].width + layout.footprints[b].width) / 2.0 + 2.0 * padding;
            let gap = (layout.local[a].x - layout.local[b].x).abs();
            assert!(
                gap >= needed - EPSILON,
                "{context}: `{}` and `{}` overlap ({gap:.1} < {needed:.1})",
                graph.name(*a),
                graph.name(*b)
            );
        }
    }
}

fn assert_unions_between_rows(graph: &FamilyGraph, layout: &FamilyLayout, context: &str) {
    for union in graph.unions().filter(|id| layout.contains(*id)) {
        let tops: Vec<f32> = graph
            .children_of(union)
            .iter()
            .filter_map(|child| layout.bounds(*child))
            .map(|(_, top, _, _)| top)
            .collect();
        if tops.is_empty() {
            continue;
        }
        let children_top = tops.into_iter().fold(f32::INFINITY, f32::min);
        let parents_bottom = graph
            .members(union)
            .into_iter()
            .flatten()
            .filter_map(|member| layout.bounds(member))
            .map(|(_, _, _, bottom)| bottom)
            .fold(f32::NEG_INFINITY, f32::max);
        let y = layout.position(union).unwrap().y;
        assert!(
            y >= parents_bottom - EPSILON && y <= children_top + EPSILON,
            "{context}: union `{}` at {y:.1} is outside {parents_bottom:.1}..{children_top:.1}",
            graph.name(union)
        );
    }
}

#[test]
fn every_fixture_and_root_satisfies_layout_properties() {
    for fixture in FIXTURES {
        let graph = load_fixture(fixture);
        let persons: Vec<NodeId> = graph.persons().collect();
        for root in persons {
            for policy in policies() {
                let context = format!("{fixture} root={} detail={policy}", graph.name(root));
                let visible = compute_visible(&graph, root, policy);
                assert!(visible.contains(&root), "{context}: root not visible");

                let layout = lay_out(&graph, root, policy);
                assert_eq!(layout.len(), visible.len(), "{context}: unplaced nodes");
                let origin = layout.local[&root];
                assert_eq!((origin.x, origin.generation), (0.0, 0), "{context}");

                assert_no_overlap(&graph, &layout, &context);
                assert_unions_between_rows(&graph, &layout, &context);

                let again = lay_out(&graph, root, policy);
                assert_eq!(layout.positions, again.positions, "{context}: not deterministic");
            }
        }
    }
}

#[test]
fn detail_levels_only_ever_add_nodes() {
    for fixture in FIXTURES {
        let graph = load_fixture(fixture);
        let everyone: BTreeSet<NodeId> = graph.ids().collect();
        for root in graph.persons() {
            let sets: Vec<_> = policies()
                .into_iter()
                .map(|policy| compute_visible(&graph, root, policy))
                .collect();
            for pair in sets.windows(2) {
                assert!(pair[0].is_subset(&pair[1]), "{fixture} root={}", graph.name(root));
            }
            assert_eq!(sets[4], everyone);
        }
    }
}

#[test]
fn unbounded_descent_reaches_every_blood_relative() {
    let graph = load_fixture("extended.fam");
    let tom = graph.require("Tom").unwrap();
    let visible = compute_visible(&graph, tom, VisibilityPolicy::unbounded());
    for relative in ["Walter", "Otto", "Nina", "Max", "Frank", "Lily"] {
        assert!(
            visible.contains(&graph.require(relative).unwrap()),
            "{relative} should be visible"
        );
    }
}

#[test]
fn carol_sees_parents_one_row_up() {
    let graph = load_fixture("simple.fam");
    let carol = graph.require("Carol").unwrap();
    let visible = compute_visible(&graph, carol, VisibilityPolicy::levels(1));
    let names: BTreeSet<&str> = visible.iter().map(|id| graph.name(*id)).collect();
    assert_eq!(
        names,
        BTreeSet::from(["Alice", "Alice + Bob", "Bob", "Carol"])
    );

    let layout = lay_out(&graph, carol, VisibilityPolicy::levels(1));
    let local = |name: &str| layout.local[&graph.require(name).unwrap()];
    assert_eq!(local("Alice").generation, -1);
    assert_eq!(local("Bob").generation, -1);
    assert!(local("Alice").x < local("Bob").x);
}

#[test]
fn remarried_person_sits_between_spouses() {
    let graph = load_fixture("remarriage.fam");
    let henry = graph.require("Henry").unwrap();
    let layout = lay_out(&graph, henry, VisibilityPolicy::levels(1));
    let x = |name: &str| layout.local[&graph.require(name).unwrap()].x;
    assert!(x("Jane") < x("Henry"));
    assert!(x("Henry") < x("Catherine"));
    assert!(x("Elizabeth") < x("Mary"));
}

#[test]
fn placeholders_never_leak_their_suffix() {
    let input = std::fs::read_to_string(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/placeholders.fam"),
    )
    .unwrap();
    let svg = render(&input).unwrap();
    assert!(svg.contains(">?</tspan>"));
    assert!(svg.contains(">...</tspan>"));
    assert!(!svg.contains("?,"));
    assert!(!svg.contains("...,"));
    assert!(!svg.contains("%2C"), "placeholder links carry the hidden suffix");
    assert!(svg.contains("href=\"#@"));
}

#[test]
fn structural_faults_are_reported() {
    let err = load_family("Alice\nBob\nAlice\n").unwrap_err();
    assert!(err.to_string().contains("`Alice`"), "{err}");

    let err = load_family("Ann\nBen\nAnn + Ben\n  c: Cid\nCid\nXena\nYuri\nXena + Yuri\n")
        .unwrap_err();
    match &err {
        FamilyError::MultipleComponents { count, summary } => {
            assert_eq!(*count, 2);
            assert!(summary.contains("`Ann` (4 nodes)"), "{summary}");
            assert!(summary.contains("`Xena` (3 nodes)"), "{summary}");
        }
        other => panic!("unexpected error {other}"),
    }

    let err = load_family("A\nB\nA + B\n  c: C, D\nC\nD\nC + D\n").unwrap_err();
    assert!(matches!(err, FamilyError::Cycle { .. }), "{err}");

    let err = load_family("A\nA + Ghost\n").unwrap_err();
    assert!(matches!(err, FamilyError::DanglingReference { .. }), "{err}");
}

#[test]
fn three_generation_chain_stacks_vertically() {
    let graph = load_family("A\nB\nA + B\n  c: C\nC\nD\nC + D\n  c: E\nE\n").unwrap();
    let a = graph.require("A").unwrap();
    let layout = lay_out(&graph, a, VisibilityPolicy::unbounded());
    let local = |name: &str| layout.local[&graph.require(name).unwrap()];
    assert!(local("A").generation < local("C").generation);
    assert!(local("C").generation < local("E").generation);
    assert!((local("A + B").x - local("C").x).abs() < EPSILON);
    assert!((local("C + D").x - local("E").x).abs() < EPSILON);
}
