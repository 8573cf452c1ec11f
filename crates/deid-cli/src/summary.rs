use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use deid_cli::report::{NodeReport, SearchReport};
use deid_core::{Anonymity, MetricKind, create_metric};

pub fn print_summary(report: &SearchReport) {
    println!("Metric: {}", report.metric_name);
    println!(
        "Data: {} rows, attributes {}",
        report.rows,
        report.attributes.join(", ")
    );
    println!(
        "Lattice: {} nodes, {} checked, {} from snapshots{}",
        report.lattice_size,
        report.checked,
        report.snapshot_hits,
        if report.truncated { " (truncated)" } else { "" }
    );
    match &report.optimum {
        Some(node) => println!(
            "Optimum: {} loss {}",
            levels(&node.transformation),
            loss_text(node.information_loss)
        ),
        None => println!("Optimum: none (no anonymous transformation found)"),
    }

    let mut table = Table::new();
    let mut header = vec![header_cell("Level")];
    header.extend(report.attributes.iter().map(String::as_str).map(header_cell));
    header.extend([
        header_cell("Anonymity"),
        header_cell("Loss"),
        header_cell("Lower bound"),
    ]);
    table.set_header(header);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    let dimensions = report.attributes.len();
    for index in 1..=dimensions {
        align_column(&mut table, index, CellAlignment::Center);
    }
    align_column(&mut table, dimensions + 2, CellAlignment::Right);
    align_column(&mut table, dimensions + 3, CellAlignment::Right);

    for node in &report.visible {
        let is_optimum = report.optimum.as_ref() == Some(node);
        let mut row = vec![Cell::new(node.level)];
        row.extend(node.transformation.iter().map(|level| {
            let cell = Cell::new(level);
            if is_optimum {
                cell.fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                cell
            }
        }));
        row.extend([
            anonymity_cell(node.anonymity),
            loss_cell(node.information_loss),
            loss_cell(node.lower_bound),
        ]);
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_metrics() {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Metric"),
        header_cell("Description"),
        header_cell("Monotonic"),
        header_cell("Independent"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Center);
    for kind in MetricKind::ALL {
        let metric = create_metric(kind);
        table.add_row(vec![
            Cell::new(kind.as_str()).add_attribute(Attribute::Bold),
            Cell::new(metric.name()),
            flag_cell(metric.is_monotonic()),
            flag_cell(metric.is_independent()),
        ]);
    }
    println!("{table}");
}

fn levels(transformation: &[u32]) -> String {
    let parts: Vec<String> = transformation.iter().map(u32::to_string).collect();
    format!("[{}]", parts.join(", "))
}

fn loss_text(loss: Option<f64>) -> String {
    loss.map_or_else(|| "-".to_string(), |value| format!("{value:.4}"))
}

fn loss_cell(loss: Option<f64>) -> Cell {
    match loss {
        Some(_) => Cell::new(loss_text(loss)),
        None => dim_cell("-"),
    }
}

fn anonymity_cell(anonymity: Anonymity) -> Cell {
    let cell = Cell::new(anonymity.as_str());
    match anonymity {
        Anonymity::Anonymous => cell.fg(Color::Green),
        Anonymity::NotAnonymous => cell.fg(Color::Red),
        Anonymity::ProbablyAnonymous | Anonymity::ProbablyNotAnonymous => cell.fg(Color::Yellow),
        Anonymity::Unknown => cell.fg(Color::DarkGrey),
    }
}

fn flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
