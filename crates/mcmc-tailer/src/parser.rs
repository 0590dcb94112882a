use tracing::warn;

use crate::columns::select_columns;

/// Comment written by Stan when warmup (adaptation) ends.
pub const ADAPTATION_TERMINATED_SENTINEL: &str = "# Adaptation terminated";

/// Which part of the chain file the parser is in. Moves forward only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Segment {
    #[default]
    Header,
    Body,
    Footer,
}

/// One data row, aligned to the retained columns. `None` marks a cell the
/// raw row was too short to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<Option<String>>,
}

impl Row {
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Best-effort numeric value of column `index`: missing cells read as
    /// `0.0`, cells that do not parse as `NaN`.
    pub fn numeric(&self, index: usize) -> f64 {
        match self.values.get(index) {
            Some(Some(raw)) => raw.trim().parse().unwrap_or(f64::NAN),
            _ => 0.0,
        }
    }
}

/// Everything parsed so far from one chain file.
#[derive(Debug, Clone, Default)]
pub struct ChainContents {
    segment: Segment,
    column_names: Option<Vec<String>>,
    column_indices: Vec<usize>,
    variable_prefixes_excluded: Option<Vec<String>>,
    rows: Vec<Row>,
    raw_header_lines: Vec<String>,
    raw_footer_lines: Vec<String>,
    excluded_initial_iteration_count: Option<usize>,
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#')
}

/// A `#` followed by nothing but whitespace.
fn is_empty_comment(line: &str) -> bool {
    line[1..].trim().is_empty()
}

impl ChainContents {
    pub fn segment(&self) -> Segment {
        self.segment
    }

    pub fn variable_names(&self) -> &[String] {
        self.column_names.as_deref().unwrap_or_default()
    }

    pub fn variable_prefixes_excluded(&self) -> Option<&[String]> {
        self.variable_prefixes_excluded.as_deref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn raw_header(&self) -> String {
        self.raw_header_lines.join("\n")
    }

    pub fn raw_footer(&self) -> String {
        self.raw_footer_lines.join("\n")
    }

    pub fn excluded_initial_iteration_count(&self) -> Option<usize> {
        self.excluded_initial_iteration_count
    }

    /// Values of `variable_name` from row `start` on. Empty for an unknown
    /// variable or a start past the end.
    pub fn sequence_data(&self, variable_name: &str, start: usize) -> Vec<f64> {
        let Some(index) = self
            .variable_names()
            .iter()
            .position(|name| name == variable_name)
        else {
            return Vec::new();
        };
        self.rows
            .get(start..)
            .unwrap_or_default()
            .iter()
            .map(|row| row.numeric(index))
            .collect()
    }

    /// Feed decoded text made of complete lines through the state machine.
    ///
    /// `include` and `threshold` only matter for the column-name row.
    pub fn ingest(&mut self, text: &str, include: &[String], threshold: usize) {
        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }
            if is_comment(line) {
                self.handle_comment(line);
                continue;
            }
            match self.segment {
                Segment::Header => self.handle_end_of_header(line, include, threshold),
                Segment::Body => self.handle_body_row(line),
                Segment::Footer => {
                    warn!(line = %line, "Unexpected non-comment in footer");
                }
            }
        }
    }

    fn handle_comment(&mut self, comment: &str) {
        match self.segment {
            Segment::Header => self.raw_header_lines.push(comment.to_string()),
            Segment::Body => {
                if is_empty_comment(comment) {
                    self.segment = Segment::Footer;
                    self.raw_footer_lines.push(comment.to_string());
                }
                self.check_adaptation_sentinel(comment);
            }
            Segment::Footer => {
                self.raw_footer_lines.push(comment.to_string());
                self.check_adaptation_sentinel(comment);
            }
        }
    }

    // First sentinel wins; later ones leave the count alone.
    fn check_adaptation_sentinel(&mut self, comment: &str) {
        if self.excluded_initial_iteration_count.is_none()
            && comment.trim() == ADAPTATION_TERMINATED_SENTINEL
        {
            self.excluded_initial_iteration_count = Some(self.rows.len());
        }
    }

    fn handle_end_of_header(&mut self, line: &str, include: &[String], threshold: usize) {
        self.segment = Segment::Body;
        if self.column_names.is_some() {
            warn!(line = %line, "Column names set while in header segment");
        }

        let fields: Vec<&str> = line.trim().split(',').collect();
        let selection = select_columns(&fields, include, threshold);
        let names: Vec<String> = selection
            .indices
            .iter()
            .map(|&i| fields[i].to_string())
            .collect();
        if names.is_empty() {
            warn!(line = %line, "Parsing column headers detected no fields to report");
        }

        self.column_names = Some(names);
        self.column_indices = selection.indices;
        self.variable_prefixes_excluded = Some(selection.excluded_prefixes);
    }

    fn handle_body_row(&mut self, line: &str) {
        let fields: Vec<&str> = line.trim().split(',').collect();
        let values = self
            .column_indices
            .iter()
            .map(|&i| fields.get(i).map(|v| v.to_string()))
            .collect();
        self.rows.push(Row { values });
    }
}
