//! End-to-end searches over the seven-row example dataset.

mod common;

use deid_core::{Anonymity, MetricKind, NodeFilter, SearchEngine, SearchResult, create_metric};
use deid_model::{
    AnonymizationConfig, DeidError, Lattice, NodeProperty, PrivacyCriterion, Problem, RowSet,
};

use common::{example_problem, exhaustive_optimum};

fn k_anonymity(k: usize) -> AnonymizationConfig {
    AnonymizationConfig::new().with_criterion(PrivacyCriterion::KAnonymity { k })
}

fn search(problem: &Problem, kind: MetricKind) -> (Lattice, SearchResult) {
    let lattice = problem.build_lattice().unwrap();
    let mut metric = create_metric(kind);
    let result = SearchEngine::new(problem, &lattice)
        .run(metric.as_mut())
        .unwrap();
    (lattice, result)
}

fn optimum(lattice: &Lattice, result: &SearchResult) -> Vec<u32> {
    let id = result.optimum.expect("an anonymous transformation exists");
    lattice[id].transformation().as_slice().to_vec()
}

#[test]
fn entropy_optimum_for_two_anonymity() {
    let problem = example_problem(k_anonymity(2));
    let (lattice, result) = search(&problem, MetricKind::Entropy);
    assert_eq!(optimum(&lattice, &result), vec![1, 1, 2]);
    let loss = result.optimum_loss.unwrap().value();
    assert!((loss - 19.26112492884004).abs() < 1e-9, "loss {loss}");
    assert!(result.snapshot_hits > 0);
}

#[test]
fn discernability_optimum_for_two_anonymity() {
    let problem = example_problem(k_anonymity(2));
    let (lattice, result) = search(&problem, MetricKind::Discernability);
    assert_eq!(optimum(&lattice, &result), vec![1, 1, 2]);
    assert_eq!(result.optimum_loss.unwrap().value(), 17.0);
}

#[test]
fn height_optimum_for_three_anonymity() {
    let problem = example_problem(k_anonymity(3));
    let (lattice, result) = search(&problem, MetricKind::Height);
    assert_eq!(optimum(&lattice, &result), vec![1, 1, 3]);
    assert_eq!(result.optimum_loss.unwrap().value(), 5.0);
}

#[test]
fn suppression_admits_finer_transformations() {
    let problem = example_problem(k_anonymity(2).with_max_outliers(0.3));
    let (lattice, result) = search(&problem, MetricKind::Entropy);
    assert_eq!(optimum(&lattice, &result), vec![1, 0, 3]);
    let loss = result.optimum_loss.unwrap().value();
    assert!((loss - 18.406371956566698).abs() < 1e-9, "loss {loss}");
}

#[test]
fn search_matches_exhaustive_evaluation() {
    for kind in MetricKind::ALL {
        for config in [k_anonymity(2), k_anonymity(3), k_anonymity(2).with_max_outliers(0.3)] {
            let problem = example_problem(config);
            let (_, result) = search(&problem, kind);
            let expected = exhaustive_optimum(&problem, kind).map(|(_, loss)| loss);
            assert_eq!(result.optimum_loss, expected, "metric {kind}");
        }
    }
}

#[test]
fn d_presence_search_matches_exhaustive_evaluation() {
    let subset = RowSet::from_rows(7, [0, 1, 2, 4, 6]).unwrap();
    let config = k_anonymity(2).with_criterion(PrivacyCriterion::DPresence {
        d_min: 0.0,
        d_max: 0.8,
        subset,
    });
    let problem = example_problem(config);
    for kind in [MetricKind::Entropy, MetricKind::Discernability] {
        let (lattice, result) = search(&problem, kind);
        let expected = exhaustive_optimum(&problem, kind);
        assert_eq!(
            result.optimum.map(|id| lattice[id].transformation().as_slice().to_vec()),
            expected.as_ref().map(|(levels, _)| levels.clone()),
            "metric {kind}"
        );
        assert_eq!(result.optimum_loss, expected.map(|(_, loss)| loss));
    }
}

#[test]
fn snapshots_do_not_change_results() {
    let cached = example_problem(k_anonymity(2));
    let mut uncached = cached.clone();
    uncached.config.max_snapshots = 0;

    for kind in [MetricKind::Discernability, MetricKind::AverageClassSize] {
        let (cached_lattice, cached_result) = search(&cached, kind);
        let (uncached_lattice, uncached_result) = search(&uncached, kind);
        assert_eq!(uncached_result.snapshot_hits, 0);
        assert_eq!(cached_result.optimum, uncached_result.optimum);
        assert_eq!(cached_result.checked, uncached_result.checked);
        for (a, b) in cached_lattice.nodes().iter().zip(uncached_lattice.nodes()) {
            assert_eq!(a.information_loss(), b.information_loss());
            assert_eq!(a.lower_bound(), b.lower_bound());
        }
    }
}

#[test]
fn tagging_is_consistent_with_checks() {
    let problem = example_problem(k_anonymity(2));
    let (lattice, _) = search(&problem, MetricKind::Discernability);
    for node in lattice.nodes() {
        assert!(
            !(node.has_property(NodeProperty::Anonymous)
                && node.has_property(NodeProperty::NotAnonymous)),
            "{} tagged both ways",
            node.transformation()
        );
        if node.has_property(NodeProperty::Anonymous) {
            for successor in node.successors() {
                assert!(lattice[*successor].has_property(NodeProperty::Anonymous));
            }
        }
    }
    // With a non-monotonic metric every node is decided.
    assert!(
        lattice
            .nodes()
            .iter()
            .all(|node| Anonymity::of(node) != Anonymity::Unknown)
    );
}

#[test]
fn independent_metrics_score_every_node() {
    let problem = example_problem(k_anonymity(2));
    let (lattice, result) = search(&problem, MetricKind::Precision);
    assert!(lattice.nodes().iter().all(|node| node.information_loss().is_some()));
    let visited = lattice
        .nodes()
        .iter()
        .filter(|node| node.has_property(NodeProperty::Visited))
        .count();
    assert_eq!(visited + result.checked, lattice.len());
}

#[test]
fn filter_around_optimum_respects_budget() {
    let problem = example_problem(k_anonymity(2));
    let (lattice, result) = search(&problem, MetricKind::Discernability);
    let filter = NodeFilter::new(lattice.dimensions(), 5)
        .initialize(&lattice, result.optimum)
        .unwrap();
    let visible = filter.visible_nodes(&lattice);
    assert!(visible.len() <= 5);
    assert!(visible.contains(&result.optimum.unwrap()));
    for id in &visible {
        assert_eq!(Anonymity::of(&lattice[*id]), Anonymity::Anonymous);
    }
}

#[test]
fn filter_without_optimum_starts_at_bottom() {
    let problem = example_problem(k_anonymity(8));
    let (lattice, result) = search(&problem, MetricKind::Entropy);
    assert!(!result.is_result_available());
    let filter = NodeFilter::new(lattice.dimensions(), lattice.len())
        .initialize(&lattice, None)
        .unwrap();
    assert_eq!(filter.visible_nodes(&lattice).len(), lattice.len());
}

#[test]
fn second_metric_needs_a_fresh_lattice() {
    let problem = example_problem(k_anonymity(2));
    let (lattice, first) = search(&problem, MetricKind::Height);
    assert_eq!(optimum(&lattice, &first), vec![1, 1, 2]);

    let mut entropy = create_metric(MetricKind::Entropy);
    let error = SearchEngine::new(&problem, &lattice)
        .run(entropy.as_mut())
        .unwrap_err();
    assert!(matches!(error, DeidError::LatticeInUse { .. }));

    let (fresh, second) = search(&problem, MetricKind::Entropy);
    assert_eq!(optimum(&fresh, &second), vec![1, 1, 2]);
}
