//! Generators for chain files shaped like sampler output.
//!
//! Cell `(row, column)` always holds `row * 1000 + column`, so tests can
//! compute expected sequence values without keeping the file around and
//! every column of a row reads differently.

use std::ops::Range;

const ROW_STRIDE: usize = 1000;

fn cell(row: usize, column: usize) -> usize {
    row * ROW_STRIDE + column
}

/// Builder for a Stan-like chain CSV.
///
/// # Example
/// ```
/// use mcmc_testing::ChainCsv;
///
/// let csv = ChainCsv::new(&["lp__", "theta"])
///     .with_header_comment("model = bernoulli_model")
///     .with_draws(4)
///     .with_adaptation_after(2)
///     .with_footer_comment("Elapsed Time: 0.01 seconds");
///
/// assert!(csv.render().starts_with("# model = bernoulli_model\nlp__,theta\n"));
/// assert_eq!(ChainCsv::value(3, 1), 3001.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChainCsv {
    columns: Vec<String>,
    header_comments: Vec<String>,
    draws: usize,
    adaptation_after: Option<usize>,
    footer_comments: Vec<String>,
}

impl ChainCsv {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    /// `lp__` followed by `count` members of the `prefix` group
    /// (`prefix.1`, `prefix.2`, ...).
    pub fn with_nuisance_group(prefix: &str, count: usize) -> Self {
        let mut columns = vec!["lp__".to_string()];
        columns.extend((1..=count).map(|i| format!("{}.{}", prefix, i)));
        Self::new(&columns)
    }

    pub fn with_header_comment(mut self, text: &str) -> Self {
        self.header_comments.push(format!("# {}", text));
        self
    }

    pub fn with_draws(mut self, draws: usize) -> Self {
        self.draws = draws;
        self
    }

    /// Emit `# Adaptation terminated` after `rows` draws.
    pub fn with_adaptation_after(mut self, rows: usize) -> Self {
        self.adaptation_after = Some(rows);
        self
    }

    /// Add a footer comment. The footer opens with an empty `#` line.
    pub fn with_footer_comment(mut self, text: &str) -> Self {
        self.footer_comments.push(format!("# {}", text));
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Numeric content of cell `(row, column)`.
    pub fn value(row: usize, column: usize) -> f64 {
        cell(row, column) as f64
    }

    /// Comments plus the column-name row.
    pub fn render_header(&self) -> String {
        let mut out = String::new();
        for comment in &self.header_comments {
            out.push_str(comment);
            out.push('\n');
        }
        out.push_str(&self.columns.join(","));
        out.push('\n');
        out
    }

    /// Draw rows in `rows`, with the adaptation sentinel where it falls.
    pub fn render_rows(&self, rows: Range<usize>) -> String {
        let mut out = String::new();
        for row in rows {
            if self.adaptation_after == Some(row) {
                out.push_str("# Adaptation terminated\n# Step size = 0.9\n");
            }
            let cells: Vec<String> = (0..self.columns.len())
                .map(|column| cell(row, column).to_string())
                .collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }

    pub fn render_footer(&self) -> String {
        if self.footer_comments.is_empty() {
            return String::new();
        }
        let mut out = String::from("#\n");
        for comment in &self.footer_comments {
            out.push_str(comment);
            out.push('\n');
        }
        out
    }

    pub fn render(&self) -> String {
        let mut out = self.render_header();
        out.push_str(&self.render_rows(0..self.draws));
        if self.adaptation_after == Some(self.draws) {
            out.push_str("# Adaptation terminated\n");
        }
        out.push_str(&self.render_footer());
        out
    }
}
