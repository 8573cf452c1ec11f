//! Shared fixtures: the seven-row age/gender/zipcode dataset and an
//! exhaustive reference search.

#![allow(dead_code)]

use deid_core::{Groupify, MetricKind, create_metric};
use deid_model::{
    AnonymizationConfig, DataMatrix, GeneralizationHierarchy, InformationLoss, Problem,
};

/// Age codes 34, 45, 66, 70 -> <50, >=50 -> *.
pub fn age() -> GeneralizationHierarchy {
    GeneralizationHierarchy::new(
        "age",
        vec![vec![0, 4, 6], vec![1, 4, 6], vec![2, 5, 6], vec![3, 5, 6]],
    )
    .unwrap()
}

/// male, female -> *.
pub fn gender() -> GeneralizationHierarchy {
    GeneralizationHierarchy::new("gender", vec![vec![0, 2], vec![1, 2]]).unwrap()
}

/// Zipcodes 81667, 81675, 81925, 81931, masked one digit per level.
pub fn zipcode() -> GeneralizationHierarchy {
    GeneralizationHierarchy::new(
        "zipcode",
        vec![
            vec![0, 4, 8, 10, 11, 12],
            vec![1, 5, 8, 10, 11, 12],
            vec![2, 6, 9, 10, 11, 12],
            vec![3, 7, 9, 10, 11, 12],
        ],
    )
    .unwrap()
}

pub fn example_rows() -> Vec<Vec<u32>> {
    vec![
        vec![0, 0, 0],
        vec![1, 1, 1],
        vec![2, 0, 2],
        vec![3, 1, 3],
        vec![0, 1, 3],
        vec![3, 0, 3],
        vec![1, 0, 3],
    ]
}

pub fn example_problem(config: AnonymizationConfig) -> Problem {
    Problem::new(
        DataMatrix::from_rows(example_rows()).unwrap(),
        vec![age(), gender(), zipcode()],
        config,
    )
    .unwrap()
}

/// Scores every anonymous node of a fresh lattice and returns the first one
/// with the lowest loss, in level order.
pub fn exhaustive_optimum(problem: &Problem, kind: MetricKind) -> Option<(Vec<u32>, InformationLoss)> {
    let lattice = problem.build_lattice().unwrap();
    let mut metric = create_metric(kind);
    metric
        .initialize(
            &problem.dictionary,
            &problem.data,
            &problem.hierarchies,
            &problem.config,
        )
        .unwrap();
    let subset = problem.config.research_subset().unwrap();

    let mut best: Option<(Vec<u32>, InformationLoss)> = None;
    for id in lattice.levels().iter().flatten() {
        let node = &lattice[*id];
        let mut groupify =
            Groupify::build(node.transformation(), &problem.data, &problem.hierarchies, subset)
                .unwrap();
        if !groupify.evaluate(&problem.config).unwrap().anonymous {
            continue;
        }
        let loss = metric.information_loss(node, &groupify).unwrap().loss;
        if best.as_ref().is_none_or(|(_, current)| loss.value() < current.value()) {
            best = Some((node.transformation().as_slice().to_vec(), loss));
        }
    }
    best
}
