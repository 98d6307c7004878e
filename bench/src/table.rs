//! Plain-text rendering of benchmark results

use compute::{BenchResult, Metric, Statistics};
use std::io::{self, Write};

/// Table with right-aligned columns
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}
//
impl Table {
    /// Start a table with some column titles
    pub fn new(header: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, which should have one cell per column
    pub fn push(&mut self, row: impl IntoIterator<Item = impl Into<String>>) {
        let row = row.into_iter().map(Into::into).collect::<Vec<_>>();
        debug_assert_eq!(row.len(), self.header.len());
        self.rows.push(row);
    }

    /// Write the table out
    pub fn write(&self, out: &mut impl Write) -> io::Result<()> {
        let mut widths = self.header.iter().map(String::len).collect::<Vec<_>>();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }
        for row in std::iter::once(&self.header).chain(&self.rows) {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:>width$}"))
                .collect::<Vec<_>>();
            writeln!(out, "{}", line.join("  ").trim_end())?;
        }
        Ok(())
    }
}

/// Full statistics of some stencils, one row per stencil
pub fn results(results: &[BenchResult]) -> Table {
    let mut table = Table::new(
        ["stencil", "verified", "bytes"]
            .into_iter()
            .map(String::from)
            .chain(distribution_titles("time-ms"))
            .chain(distribution_titles("bw-GB/s"))
            .chain(distribution_titles("counter"))
            .chain(distribution_titles("imbalance")),
    );
    for result in results {
        table.push(
            [
                result.stencil.to_owned(),
                result.verified.to_string(),
                result.bytes.to_string(),
            ]
            .into_iter()
            .chain(distribution_cells(&result.time, 1000.0, 4))
            .chain(distribution_cells(&result.bandwidth, 1.0, 2))
            .chain(distribution_cells(&result.counter, 1.0, 0))
            .chain(distribution_cells(&result.counter_imbalance, 1.0, 3)),
        );
    }
    table
}

/// Cell of a sweep table, holding the chosen metric of one result
pub fn metric_cell(metric: Metric, result: &BenchResult) -> String {
    let value = metric.value(result) * metric.scale();
    let marker = if result.verified { "" } else { "!" };
    format!("{value:.3}{marker}")
}

/// Titles of the avg/min/max columns of a distribution
fn distribution_titles(name: &str) -> [String; 3] {
    ["avg", "min", "max"].map(|stat| format!("{name}-{stat}"))
}

/// Cells of the avg/min/max columns of a distribution
fn distribution_cells(stats: &Statistics, scale: f64, precision: usize) -> [String; 3] {
    [stats.avg(), stats.min(), stats.max()].map(|value| format!("{:.precision$}", value * scale))
}
