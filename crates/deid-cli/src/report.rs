//! Search runs and their serializable outcome.

use serde::Serialize;
use tracing::{debug, info_span};

use deid_core::{
    Anonymity, FilterOptions, MetricKind, NodeFilter, SearchEngine, SearchListener, create_metric,
};
use deid_model::{Lattice, Node, NodeId, Problem, Result};

/// Outcome of one search, with the nodes the filter made visible.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub metric: MetricKind,
    pub metric_name: &'static str,
    pub attributes: Vec<String>,
    pub rows: usize,
    pub lattice_size: usize,
    pub checked: usize,
    pub snapshot_hits: usize,
    pub truncated: bool,
    pub optimum: Option<NodeReport>,
    /// Lowest and highest known loss in the lattice.
    pub min_information_loss: f64,
    pub max_information_loss: f64,
    pub visible: Vec<NodeReport>,
}

impl SearchReport {
    pub fn is_result_available(&self) -> bool {
        self.optimum.is_some()
    }
}

/// One lattice node as reported to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub transformation: Vec<u32>,
    pub level: u32,
    pub anonymity: Anonymity,
    pub information_loss: Option<f64>,
    pub lower_bound: Option<f64>,
}

impl From<&Node> for NodeReport {
    fn from(node: &Node) -> Self {
        Self {
            transformation: node.transformation().as_slice().to_vec(),
            level: node.level(),
            anonymity: Anonymity::of(node),
            information_loss: node.information_loss().map(|loss| loss.value()),
            lower_bound: node.lower_bound().map(|bound| bound.value()),
        }
    }
}

/// Logs per-level progress of a running search.
#[derive(Debug, Default)]
pub struct ProgressLog {
    levels: usize,
}

impl SearchListener for ProgressLog {
    fn level_finished(&mut self, level: usize, checked: usize) {
        self.levels += 1;
        debug!(level, checked, "lattice level finished");
    }
}

/// Searches `problem` with the given metric and selects the visible nodes.
///
/// # Errors
///
/// Propagates invalid problems and failures from grouping or scoring.
pub fn search_problem(
    problem: &Problem,
    kind: MetricKind,
    options: &FilterOptions,
) -> Result<SearchReport> {
    let span = info_span!("search_problem", metric = %kind);
    let _guard = span.enter();

    let lattice = problem.build_lattice()?;
    let mut metric = create_metric(kind);
    let mut progress = ProgressLog::default();
    let result =
        SearchEngine::new(problem, &lattice).run_with_listener(metric.as_mut(), &mut progress)?;
    let filter = NodeFilter::with_options(lattice.dimensions(), options)
        .initialize(&lattice, result.optimum)?;
    let visible = filter.visible_nodes(&lattice);
    debug!(levels = progress.levels, visible = visible.len(), "report assembled");

    let (min, max) = lattice.loss_bounds();
    Ok(SearchReport {
        metric: kind,
        metric_name: metric.name(),
        attributes: problem
            .hierarchies
            .iter()
            .map(|hierarchy| hierarchy.name().to_string())
            .collect(),
        rows: problem.data.num_rows(),
        lattice_size: lattice.len(),
        checked: result.checked,
        snapshot_hits: result.snapshot_hits,
        truncated: result.truncated,
        optimum: result.optimum.map(|id| NodeReport::from(&lattice[id])),
        min_information_loss: min.value(),
        max_information_loss: max.value(),
        visible: nodes(&lattice, &visible),
    })
}

fn nodes(lattice: &Lattice, ids: &[NodeId]) -> Vec<NodeReport> {
    ids.iter().map(|id| NodeReport::from(&lattice[*id])).collect()
}
