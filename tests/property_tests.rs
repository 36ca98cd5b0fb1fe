#![allow(missing_docs)]

use std::collections::BTreeSet;

use lineage_forest::{CyclicPalette, Forest, LayoutOptions, NodeId};
use proptest::prelude::*;
use proptest::sample::Index;

#[derive(Debug, Clone)]
struct NodePlan {
    ordinal: u32,
    parent: Option<Index>,
}

fn arb_plan() -> impl Strategy<Value = NodePlan> {
    (0u32..6, prop::option::weighted(0.7, any::<Index>()))
        .prop_map(|(ordinal, parent)| NodePlan { ordinal, parent })
}

fn build_forest(plans: &[NodePlan]) -> Forest {
    let mut forest = Forest::new();
    let names: Vec<String> = plans
        .iter()
        .enumerate()
        .map(|(i, plan)| format!("{}_{}", plan.ordinal, i + 1))
        .collect();
    for (i, plan) in plans.iter().enumerate() {
        forest
            .add_node(names[i].as_str(), plan.ordinal, Some(i as u32 + 1))
            .expect("unique node");
    }
    for (i, plan) in plans.iter().enumerate() {
        let Some(pick) = &plan.parent else { continue };
        let earlier: Vec<usize> = (0..plans.len())
            .filter(|j| plans[*j].ordinal < plan.ordinal)
            .collect();
        if earlier.is_empty() {
            continue;
        }
        let parent = earlier[pick.index(earlier.len())];
        forest
            .link(&NodeId::from(names[parent].as_str()), &NodeId::from(names[i].as_str()))
            .expect("ordinal-increasing link");
    }
    forest
}

fn recomputed(plans: &[NodePlan]) -> Forest {
    let mut forest = build_forest(plans);
    forest
        .recompute(&LayoutOptions::default(), &CyclicPalette::default())
        .expect("recompute");
    forest
}

proptest! {
    #[test]
    fn prop_tracks_and_lineages_partition_all_nodes(plans in prop::collection::vec(arb_plan(), 1..40)) {
        let forest = recomputed(&plans);
        let all: BTreeSet<&NodeId> = forest.nodes().map(|n| &n.id).collect();

        let mut in_tracks = BTreeSet::new();
        for track in forest.tracks().expect("tracks").values() {
            for member in &track.members {
                prop_assert!(in_tracks.insert(member), "{} in two tracks", member);
                let node = forest.node(member).expect("member exists");
                prop_assert_eq!(node.track_ancestor(), Some(&track.root));
            }
        }
        let mut in_lineages = BTreeSet::new();
        for lineage in forest.lineages().expect("lineages").values() {
            prop_assert!(forest.node(&lineage.root).expect("root").parent_id().is_none());
            for member in &lineage.members {
                prop_assert!(in_lineages.insert(member), "{} in two lineages", member);
            }
        }
        prop_assert_eq!(&in_tracks, &all);
        prop_assert_eq!(&in_lineages, &all);
    }

    #[test]
    fn prop_parents_precede_children(plans in prop::collection::vec(arb_plan(), 1..40)) {
        let forest = build_forest(&plans);
        for node in forest.nodes() {
            if let Some(parent) = node.parent_id() {
                let parent = forest.node(parent).expect("parent exists");
                prop_assert!(parent.ordinal < node.ordinal);
                prop_assert!(parent.children_ids().any(|c| c == &node.id));
            }
        }
    }

    #[test]
    fn prop_offsets_follow_children(plans in prop::collection::vec(arb_plan(), 1..40)) {
        let forest = recomputed(&plans);
        for node in forest.nodes() {
            let offset = node.offset().expect("every node laid out");
            let children: Vec<f64> = node
                .children_ids()
                .map(|c| forest.node(c).and_then(|n| n.offset()).expect("child offset"))
                .collect();
            match children.as_slice() {
                [] => {}
                [only] => prop_assert_eq!(offset, *only),
                [first, .., last] => prop_assert_eq!(offset, 0.5 * (first + last)),
            }
        }
    }

    #[test]
    fn prop_recompute_is_deterministic(plans in prop::collection::vec(arb_plan(), 1..40)) {
        let mut forest = recomputed(&plans);
        let first = forest.json_ob(false);
        forest
            .recompute(&LayoutOptions::default(), &CyclicPalette::default())
            .expect("second recompute");
        prop_assert_eq!(&forest.json_ob(false), &first);
        prop_assert_eq!(&recomputed(&plans).json_ob(false), &first);

        let mut clone = forest.clean_clone();
        clone
            .recompute(&LayoutOptions::default(), &CyclicPalette::default())
            .expect("clone recompute");
        prop_assert_eq!(&clone.json_ob(false), &first);
    }

    #[test]
    fn prop_snapshot_round_trips(plans in prop::collection::vec(arb_plan(), 1..40)) {
        let forest = recomputed(&plans);
        let text = forest.to_json(false).expect("encode");
        let restored = Forest::from_json(&text).expect("decode");
        prop_assert_eq!(restored.json_ob(false), forest.json_ob(false));
    }

    #[test]
    fn prop_region_views_are_well_formed(plans in prop::collection::vec(arb_plan(), 1..40)) {
        let forest = recomputed(&plans);
        for ts in forest.timestamps() {
            let view = forest.timestamp_region_json(ts.ordinal());
            prop_assert!(view.ordinals.contains(&ts.ordinal()));
            prop_assert_eq!(view.height, view.ordinals.len());

            let targets: BTreeSet<&NodeId> = view
                .id_to_node
                .iter()
                .filter(|(_, node)| node.is_child)
                .map(|(id, _)| id)
                .collect();
            prop_assert_eq!(targets, ts.node_ids().collect::<BTreeSet<_>>());

            for node in view.id_to_node.values() {
                prop_assert!(node.x < view.width);
                prop_assert!(node.y < view.height);
                prop_assert_eq!(node.y == 0, node.node.timestamp_ordinal == ts.ordinal());
            }
        }
    }
}
