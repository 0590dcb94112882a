use std::sync::Arc;

/// Merge a delta that starts at row `position` into a cached vector.
///
/// Rows the cache already holds are never rewritten. When the delta adds
/// nothing (it leaves a gap, or ends within the cached rows) the very same
/// `Arc` is returned, so `Arc::ptr_eq` tells a caller the merge was a no-op.
/// Otherwise a new vector holding `existing` plus the unseen tail of `data`
/// is returned and `existing` is left untouched.
pub fn append_data(existing: &Arc<Vec<f64>>, position: usize, data: &[f64]) -> Arc<Vec<f64>> {
    let known = existing.len();
    if position > known || position + data.len() <= known {
        return Arc::clone(existing);
    }

    let mut merged = Vec::with_capacity(position + data.len());
    merged.extend_from_slice(existing);
    merged.extend_from_slice(&data[known - position..]);
    Arc::new(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(values: &[f64]) -> Arc<Vec<f64>> {
        Arc::new(values.to_vec())
    }

    #[test]
    fn test_overlap_is_trimmed() {
        let existing = cached(&[1.0, 2.0, 3.0]);
        let merged = append_data(&existing, 1, &[2.0, 3.0, 4.0, 5.0]);

        assert_eq!(*merged, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(*existing, vec![1.0, 2.0, 3.0]);
        assert!(!Arc::ptr_eq(&merged, &existing));
    }

    #[test]
    fn test_second_application_is_noop() {
        let existing = cached(&[1.0, 2.0, 3.0]);
        let once = append_data(&existing, 1, &[2.0, 3.0, 4.0, 5.0]);
        let twice = append_data(&once, 1, &[2.0, 3.0, 4.0, 5.0]);

        assert!(Arc::ptr_eq(&once, &twice));
    }

    #[test]
    fn test_gap_is_ignored() {
        let existing = cached(&[1.0]);
        let merged = append_data(&existing, 3, &[4.0, 5.0]);
        assert!(Arc::ptr_eq(&merged, &existing));
    }

    #[test]
    fn test_already_known_delta_is_ignored() {
        let existing = cached(&[1.0, 2.0, 3.0]);
        assert!(Arc::ptr_eq(&append_data(&existing, 0, &[1.0, 2.0]), &existing));
        assert!(Arc::ptr_eq(&append_data(&existing, 3, &[]), &existing));
        assert!(Arc::ptr_eq(&append_data(&existing, 1, &[2.0, 3.0]), &existing));
    }

    #[test]
    fn test_append_at_end() {
        let existing = cached(&[]);
        let merged = append_data(&existing, 0, &[7.0, 8.0]);
        assert_eq!(*merged, vec![7.0, 8.0]);

        let merged = append_data(&merged, 2, &[9.0]);
        assert_eq!(*merged, vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_nan_cells_are_kept() {
        let existing = cached(&[1.0]);
        let merged = append_data(&existing, 1, &[f64::NAN]);
        assert_eq!(merged.len(), 2);
        assert!(merged[1].is_nan());
    }
}
