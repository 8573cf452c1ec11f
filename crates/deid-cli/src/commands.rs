use std::fs;

use anyhow::{Context, Result};
use tracing::{info, info_span, warn};

use deid_cli::report::{SearchReport, search_problem};
use deid_core::FilterOptions;
use deid_model::Problem;

use crate::cli::SearchArgs;

pub fn run_search(args: &SearchArgs) -> Result<SearchReport> {
    let span = info_span!("run_search", problem = %args.problem.display());
    let _guard = span.enter();

    let text = fs::read_to_string(&args.problem)
        .with_context(|| format!("read problem {}", args.problem.display()))?;
    let mut problem: Problem = serde_json::from_str(&text)
        .with_context(|| format!("parse problem {}", args.problem.display()))?;
    if args.max_checks.is_some() {
        problem.config = problem.config.with_max_checks(args.max_checks);
    }
    if args.no_snapshots {
        problem.config = problem.config.with_max_snapshots(0);
    }
    problem.validate().context("validate problem")?;
    info!(
        rows = problem.data.num_rows(),
        attributes = problem.hierarchies.len(),
        "problem loaded"
    );

    let options = FilterOptions {
        max_visible_nodes: args.max_visible,
    };
    let report = search_problem(&problem, args.metric.into(), &options).context("search")?;
    if report.truncated {
        warn!(checked = report.checked, "search stopped by check budget");
    }
    Ok(report)
}
