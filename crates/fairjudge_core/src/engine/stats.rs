//! Load statistics used by the balancer.

use std::cmp::Ordering;

/// Median of `values`; an even-length input yields the mean of the two
/// middle elements. Empty input yields `0.0`.
pub fn median(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) as f64 / 2.0
    } else {
        sorted[middle] as f64
    }
}

/// Arithmetic mean of `values`; empty input yields `0.0`.
pub fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<usize>() as f64 / values.len() as f64
}

/// Per-subject load ceiling: `max(median, configured_minimum, mean)`.
pub fn lower_bound(values: &[usize], configured_minimum: u32) -> f64 {
    median(values)
        .max(f64::from(configured_minimum))
        .max(mean(values))
}

/// Load pressure of one placement: projects per eligible judge.
///
/// `None` when no judge covers the placement.
pub fn quotient(project_count: usize, judge_count: usize) -> Option<f64> {
    if judge_count == 0 {
        return None;
    }
    Some(project_count as f64 / judge_count as f64)
}

/// Orders quotients ascending with undefined quotients last.
pub fn compare_quotients(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::{compare_quotients, lower_bound, mean, median, quotient};
    use std::cmp::Ordering;

    #[test]
    fn median_handles_odd_and_even_lengths() {
        assert_eq!(median(&[5, 1, 3]), 3.0);
        assert_eq!(median(&[4, 1, 2, 3]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn mean_of_loads() {
        assert_eq!(mean(&[5, 0, 1]), 2.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn lower_bound_takes_largest_of_three() {
        // median 0, mean 1.25, floor 1
        assert_eq!(lower_bound(&[5, 0, 0, 0], 1), 1.25);
        // median 3 dominates
        assert_eq!(lower_bound(&[3, 3, 0], 1), 3.0);
        // configured floor dominates
        assert_eq!(lower_bound(&[1, 1, 1], 4), 4.0);
    }

    #[test]
    fn quotient_is_undefined_without_judges() {
        assert_eq!(quotient(4, 2), Some(2.0));
        assert_eq!(quotient(4, 0), None);
    }

    #[test]
    fn undefined_quotients_sort_last() {
        let mut values = vec![None, Some(2.0), Some(0.5)];
        values.sort_by(|left, right| compare_quotients(*left, *right));
        assert_eq!(values, vec![Some(0.5), Some(2.0), None]);
        assert_eq!(compare_quotients(None, None), Ordering::Equal);
    }
}
