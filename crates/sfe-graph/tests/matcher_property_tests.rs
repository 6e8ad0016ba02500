use proptest::prelude::*;
use sfe_graph::{
    create_matcher, matching_targets, Allowed, Dictionary, FeatureMatcher, InMemoryGraph,
    PathDescriptor, PathMatcher, PathStep,
};
use std::collections::HashSet;

const MAX_EDGE_TYPES: u32 = 6;
const MAX_PATH_LEN: usize = 6;
const MAX_NODES: u32 = 12;
const MAX_EDGES: usize = 60;

fn path_strategy() -> impl Strategy<Value = PathDescriptor> {
    prop::collection::vec((0u32..MAX_EDGE_TYPES, any::<bool>()), 0..=MAX_PATH_LEN).prop_map(
        |steps| {
            PathDescriptor::new(
                steps
                    .into_iter()
                    .map(|(edge_type, reverse)| PathStep::new(edge_type, reverse))
                    .collect(),
            )
        },
    )
}

fn vocab() -> Dictionary {
    (0..MAX_EDGE_TYPES).map(|i| format!("r{i}")).collect()
}

/// Brute force: every node reachable by walking `path` edge by edge.
fn reference_targets(
    edges: &[(u32, u32, u32)],
    source: u32,
    path: &PathDescriptor,
) -> HashSet<u32> {
    let mut frontier: HashSet<u32> = HashSet::from([source]);
    for step in path.steps() {
        let mut next = HashSet::new();
        for &(src, rel, dst) in edges {
            if rel != step.edge_type {
                continue;
            }
            if !step.reverse && frontier.contains(&src) {
                next.insert(dst);
            }
            if step.reverse && frontier.contains(&dst) {
                next.insert(src);
            }
        }
        frontier = next;
    }
    frontier
}

proptest! {
    #[test]
    fn is_finished_flips_at_num_hops(path in path_strategy(), extra in 0usize..4) {
        let n = path.num_hops();
        let m = PathMatcher::new(path);
        for k in 0..n {
            prop_assert!(!m.is_finished(k));
        }
        prop_assert!(m.is_finished(n + extra));
    }

    #[test]
    fn edge_ok_accepts_only_the_step_at_k(path in path_strategy()) {
        let m = PathMatcher::new(path.clone());
        for (k, step) in path.steps().iter().enumerate() {
            for edge_type in 0..MAX_EDGE_TYPES {
                for reverse in [false, true] {
                    let expected = edge_type == step.edge_type && reverse == step.reverse;
                    prop_assert_eq!(m.edge_ok(edge_type, reverse, k), expected);
                }
            }
            prop_assert_eq!(m.allowed_edges(k), Allowed::only((step.edge_type, step.reverse)));
        }
        prop_assert!(m.allowed_edges(path.num_hops()).is_unknown());
        prop_assert!(!m.edge_ok(0, false, path.num_hops()));
    }

    #[test]
    fn factory_roundtrips_canonical_text(path in path_strategy()) {
        prop_assume!(!path.is_empty());
        let v = vocab();
        let text = path.encode(&v).unwrap();
        let m = create_matcher(&text, true, &v).unwrap().expect("canonical text parses");
        prop_assert_eq!(m.path(), &path);

        let doubled = format!("{text}-");
        prop_assert!(create_matcher(&doubled, true, &v).unwrap().is_none());
    }

    #[test]
    fn walker_agrees_with_brute_force(
        edges in prop::collection::vec((0u32..MAX_NODES, 0u32..MAX_EDGE_TYPES, 0u32..MAX_NODES), 0..=MAX_EDGES),
        path in path_strategy(),
        source in 0u32..MAX_NODES,
    ) {
        let mut graph = InMemoryGraph::new();
        // Intern r0..rN first so edge-type ids equal the generated ones.
        for i in 0..MAX_EDGE_TYPES {
            graph.edge_types().intern(&format!("r{i}"));
        }
        for &(src, rel, dst) in &edges {
            graph.add_edge(src, &format!("r{rel}"), dst);
        }

        let m = PathMatcher::new(path.clone());
        let got: HashSet<u32> = matching_targets(&graph, source, &m).into_iter().collect();
        prop_assert_eq!(got, reference_targets(&edges, source, &path));
    }
}
