//! Level-wise lattice search for the optimal anonymous transformation.
//!
//! The engine walks the lattice bottom-up, one level at a time. Each candidate
//! node is grouped, its privacy criteria are evaluated, and the metric scores
//! it. Work is avoided in three ways:
//!
//! - **Predictive tagging**: with monotonic criteria, generalizations of an
//!   anonymous node are anonymous and specializations of a non-anonymous node
//!   are not. k-anonymity verdicts are propagated the same way for any
//!   criteria set.
//! - **Pruning**: with a monotonic metric, no generalization of an anonymous
//!   node (or of a node whose bound already reaches the best loss) can be
//!   strictly better, so its successors are never checked.
//! - **Snapshots**: groupers of small transformations are kept on their nodes
//!   and used to group direct generalizations without rescanning the data.
//!
//! Independent metrics get a second pass that fills in the loss of every node
//! left unscored.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, info_span, trace};

use deid_model::{
    DeidError, InformationLoss, Lattice, Node, NodeId, NodeProperty, Problem, Result,
};

use crate::groupify::{Groupify, Snapshot};
use crate::metric::Metric;

/// Receives search progress.
pub trait SearchListener {
    /// Called at most once per node, after it was checked and scored.
    fn node_checked(&mut self, _node: &Node) {}

    /// Called after each lattice level with the running number of checks.
    fn level_finished(&mut self, _level: usize, _checked: usize) {}
}

struct NoopListener;

impl SearchListener for NoopListener {}

/// Outcome of a search run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// Anonymous node with the lowest loss, if any node is anonymous.
    pub optimum: Option<NodeId>,
    pub optimum_loss: Option<InformationLoss>,
    /// Nodes whose criteria were evaluated explicitly.
    pub checked: usize,
    /// Checks grouped from a retained snapshot.
    pub snapshot_hits: usize,
    /// Whether the check budget stopped the search early.
    pub truncated: bool,
}

impl SearchResult {
    pub fn is_result_available(&self) -> bool {
        self.optimum.is_some()
    }
}

/// Searches the lattice of a problem.
pub struct SearchEngine<'a> {
    problem: &'a Problem,
    lattice: &'a Lattice,
    retained: VecDeque<NodeId>,
    best: Option<(NodeId, InformationLoss)>,
    checked: usize,
    snapshot_hits: usize,
}

impl<'a> SearchEngine<'a> {
    pub fn new(problem: &'a Problem, lattice: &'a Lattice) -> Self {
        Self {
            problem,
            lattice,
            retained: VecDeque::new(),
            best: None,
            checked: 0,
            snapshot_hits: 0,
        }
    }

    pub fn run(&mut self, metric: &mut dyn Metric) -> Result<SearchResult> {
        self.run_with_listener(metric, &mut NoopListener)
    }

    /// Runs the search, notifying `listener` of progress.
    ///
    /// # Errors
    ///
    /// Fails when the problem is inconsistent, the lattice does not belong to
    /// it or already carries state from an earlier run, or the metric cannot
    /// be initialized. Errors from grouping and
    /// scoring abort the run.
    pub fn run_with_listener(
        &mut self,
        metric: &mut dyn Metric,
        listener: &mut dyn SearchListener,
    ) -> Result<SearchResult> {
        let problem = self.problem;
        let lattice = self.lattice;
        problem.validate()?;
        let max_levels = problem.max_levels();
        if lattice.max_levels() != max_levels.as_slice() {
            return Err(DeidError::DimensionMismatch {
                expected: max_levels.len(),
                actual: lattice.dimensions(),
            });
        }
        if let Some(node) = lattice.nodes().iter().find(|node| {
            !node.properties().is_empty()
                || node.information_loss().is_some()
                || node.lower_bound().is_some()
        }) {
            return Err(DeidError::LatticeInUse {
                id: node.id().index(),
            });
        }
        metric.initialize(
            &problem.dictionary,
            &problem.data,
            &problem.hierarchies,
            &problem.config,
        )?;

        let span = info_span!("search", metric = metric.name(), nodes = lattice.len());
        let _guard = span.enter();
        info!(
            levels = lattice.levels().len(),
            rows = problem.data.num_rows(),
            monotonic_criteria = problem.config.is_monotonic(),
            monotonic_metric = metric.is_monotonic(),
            "starting search"
        );

        self.retained.clear();
        self.best = None;
        self.checked = 0;
        self.snapshot_hits = 0;
        lattice.bottom().set_property(NodeProperty::ForceSnapshot);

        let mut truncated = false;
        let depth = lattice.levels().len();
        for (level, nodes) in lattice.levels().iter().enumerate() {
            self.evict_snapshots(level);
            for id in nodes {
                self.visit(&lattice[*id], metric, listener)?;
            }
            listener.level_finished(level, self.checked);
            debug!(
                level,
                checked = self.checked,
                retained = self.retained.len(),
                "level finished"
            );
            if let Some(max_checks) = problem.config.max_checks
                && self.checked >= max_checks
                && level + 1 < depth
            {
                info!(level, checked = self.checked, max_checks, "check budget exhausted");
                truncated = true;
                break;
            }
        }
        self.evict_snapshots(usize::MAX);

        if metric.is_independent() {
            let visited = self.fill_independent_losses(metric)?;
            debug!(visited, "filled losses of unchecked nodes");
        }

        let result = SearchResult {
            optimum: self.best.map(|(id, _)| id),
            optimum_loss: self.best.map(|(_, loss)| loss),
            checked: self.checked,
            snapshot_hits: self.snapshot_hits,
            truncated,
        };
        match self.best {
            Some((id, loss)) => info!(
                optimum = %lattice[id].transformation(),
                loss = %loss,
                checked = result.checked,
                snapshot_hits = result.snapshot_hits,
                "search finished"
            ),
            None => info!(checked = result.checked, "search finished without anonymous node"),
        }
        Ok(result)
    }

    fn visit(
        &mut self,
        node: &Node,
        metric: &mut dyn Metric,
        listener: &mut dyn SearchListener,
    ) -> Result<()> {
        let lattice = self.lattice;
        if node.has_property(NodeProperty::Checked) {
            return Ok(());
        }
        if node
            .predecessors()
            .iter()
            .any(|id| lattice[*id].has_property(NodeProperty::SuccessorsPruned))
        {
            node.set_property(NodeProperty::InsufficientUtility);
            node.set_property(NodeProperty::SuccessorsPruned);
            return Ok(());
        }
        if node.has_property(NodeProperty::NotKAnonymous)
            || node.has_property(NodeProperty::NotAnonymous)
        {
            node.set_property(NodeProperty::NotAnonymous);
            return Ok(());
        }
        if metric.is_monotonic() {
            if node.has_property(NodeProperty::Anonymous) {
                return Ok(());
            }
            if let Some((_, best)) = self.best
                && let Some(bound) = metric.lower_bound(node)?
            {
                node.set_lower_bound(bound);
                if bound.compare(best) != Ordering::Less {
                    trace!(node = %node.transformation(), bound = %bound, "pruned by bound");
                    node.set_property(NodeProperty::InsufficientUtility);
                    node.set_property(NodeProperty::SuccessorsPruned);
                    return Ok(());
                }
            }
        }
        self.check(node, metric, listener)
    }

    fn check(
        &mut self,
        node: &Node,
        metric: &mut dyn Metric,
        listener: &mut dyn SearchListener,
    ) -> Result<()> {
        let problem = self.problem;
        let config = &problem.config;
        let (mut groupify, source) = self.group(node)?;
        let verdict = groupify.evaluate(config)?;
        self.checked += 1;

        node.set_property(NodeProperty::Checked);
        node.set_property(if verdict.anonymous {
            NodeProperty::Anonymous
        } else {
            NodeProperty::NotAnonymous
        });
        match verdict.k_anonymous {
            Some(true) => node.set_property(NodeProperty::KAnonymous),
            Some(false) => node.set_property(NodeProperty::NotKAnonymous),
            None => {}
        }

        let loss = metric.evaluate(node, &groupify)?;
        self.retain_snapshot(node, &groupify, source.as_deref());
        trace!(
            node = %node.transformation(),
            anonymous = verdict.anonymous,
            loss = %loss.loss,
            classes = groupify.statistics().num_classes,
            "checked"
        );
        if !node.properties().test_and_set(NodeProperty::EventFired) {
            listener.node_checked(node);
        }

        if verdict.k_anonymous == Some(true) {
            self.propagate(node, Direction::Up, NodeProperty::KAnonymous);
        }
        if verdict.anonymous {
            if self
                .best
                .is_none_or(|(_, best)| loss.loss.compare(best) == Ordering::Less)
            {
                self.best = Some((node.id(), loss.loss));
            }
            if config.is_monotonic() {
                self.propagate(node, Direction::Up, NodeProperty::Anonymous);
            }
            if metric.is_monotonic() {
                node.set_property(NodeProperty::SuccessorsPruned);
            }
        } else {
            if config.is_monotonic() {
                self.propagate(node, Direction::Down, NodeProperty::NotAnonymous);
            }
            if verdict.k_anonymous == Some(false) {
                self.propagate(node, Direction::Down, NodeProperty::NotKAnonymous);
            }
        }
        Ok(())
    }

    /// Groups a node, seeding from the smallest snapshot among its direct
    /// predecessors when one is retained.
    fn group(&mut self, node: &Node) -> Result<(Groupify, Option<Arc<Snapshot>>)> {
        let problem = self.problem;
        let source = node
            .predecessors()
            .iter()
            .filter_map(|id| self.lattice[*id].data::<Snapshot>())
            .min_by_key(|snapshot| snapshot.len());
        match source {
            Some(snapshot) => {
                self.snapshot_hits += 1;
                let groupify = Groupify::from_snapshot(
                    &snapshot,
                    node.transformation(),
                    &problem.data,
                    &problem.hierarchies,
                )?;
                Ok((groupify, Some(snapshot)))
            }
            None => {
                let groupify = Groupify::build(
                    node.transformation(),
                    &problem.data,
                    &problem.hierarchies,
                    problem.config.research_subset()?,
                )?;
                Ok((groupify, None))
            }
        }
    }

    fn retain_snapshot(&mut self, node: &Node, groupify: &Groupify, source: Option<&Snapshot>) {
        let problem = self.problem;
        let config = &problem.config;
        if config.max_snapshots == 0 {
            return;
        }
        let classes = groupify.entries().len() as f64;
        let rows = groupify.statistics().num_population_rows as f64;
        let keep = node.has_property(NodeProperty::ForceSnapshot)
            || (classes <= config.snapshot_size_dataset * rows
                && source.is_none_or(|source| {
                    classes <= config.snapshot_size_snapshot * source.len() as f64
                }));
        if !keep {
            return;
        }
        while self.retained.len() >= config.max_snapshots {
            if let Some(oldest) = self.retained.pop_front() {
                self.lattice[oldest].clear_data();
            }
        }
        node.set_data(groupify.snapshot());
        self.retained.push_back(node.id());
    }

    /// Drops snapshots that can no longer seed a node at `level`.
    fn evict_snapshots(&mut self, level: usize) {
        let lattice = self.lattice;
        self.retained.retain(|id| {
            let node = &lattice[*id];
            let keep = node.level() as usize + 1 >= level;
            if !keep {
                node.clear_data();
            }
            keep
        });
    }

    /// Tags `start`'s generalizations (or specializations) transitively.
    ///
    /// A node already carrying the property has its closure tagged, so the
    /// walk stops there.
    fn propagate(&self, start: &Node, direction: Direction, property: NodeProperty) {
        let lattice = self.lattice;
        let mut stack: Vec<NodeId> = direction.neighbours(start).to_vec();
        while let Some(id) = stack.pop() {
            let node = &lattice[id];
            if node.properties().test_and_set(property) {
                continue;
            }
            if property == NodeProperty::NotKAnonymous {
                node.set_property(NodeProperty::NotAnonymous);
            }
            stack.extend_from_slice(direction.neighbours(node));
        }
    }

    fn fill_independent_losses(&self, metric: &mut dyn Metric) -> Result<usize> {
        let mut visited = 0;
        for node in self.lattice.nodes() {
            if node.information_loss().is_some()
                || node.properties().test_and_set(NodeProperty::Visited)
            {
                continue;
            }
            if let Some(loss) = metric.independent_information_loss(node)? {
                node.set_information_loss(loss.loss);
                node.set_lower_bound(loss.lower_bound);
                visited += 1;
            }
        }
        Ok(visited)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn neighbours(self, node: &Node) -> &[NodeId] {
        match self {
            Direction::Up => node.successors(),
            Direction::Down => node.predecessors(),
        }
    }
}
