use std::collections::{BTreeSet, HashMap};

/// Prefix groups with more members than this are dropped by default.
pub const DEFAULT_EXCLUDED_PREFIX_THRESHOLD: usize = 100;

/// Columns kept from a chain's column-name row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    /// Indices into the raw row, ascending.
    pub indices: Vec<usize>,
    /// Prefix groups that lost at least one column, sorted and deduplicated.
    pub excluded_prefixes: Vec<String>,
}

/// The group a column belongs to: everything before the first `.`, or the
/// whole name when there is no `.`.
fn prefix_of(name: &str) -> &str {
    name.split('.').next().unwrap_or("")
}

/// Decide which columns of a header row to keep.
///
/// Columns are grouped by [`prefix_of`]. A group with more than `threshold`
/// members is a candidate for exclusion; its members are dropped unless
/// their exact name is listed in `include`. A candidate group is reported in
/// `excluded_prefixes` only if something was actually dropped from it.
pub fn select_columns<S: AsRef<str>>(
    fields: &[S],
    include: &[String],
    threshold: usize,
) -> ColumnSelection {
    let mut prefix_counts: HashMap<&str, usize> = HashMap::new();
    for field in fields {
        *prefix_counts.entry(prefix_of(field.as_ref())).or_default() += 1;
    }

    let mut indices = Vec::with_capacity(fields.len());
    let mut excluded = BTreeSet::new();
    for (i, field) in fields.iter().enumerate() {
        let name = field.as_ref();
        if include.iter().any(|v| v == name) {
            indices.push(i);
            continue;
        }
        let prefix = prefix_of(name);
        if prefix_counts.get(prefix).copied().unwrap_or(0) > threshold {
            excluded.insert(prefix.to_string());
        } else {
            indices.push(i);
        }
    }

    ColumnSelection {
        indices,
        excluded_prefixes: excluded.into_iter().collect(),
    }
}
