use std::cmp::Ordering;
use thiserror::Error;

/// InputValueError is used if some simulation option or parameter does not fulfill the posed
/// requirements, e.g., a non-positive round distance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputValueError {
    #[error("Invalid input value: {name} must be positive, but is {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("Invalid input value: {name} must be in [{min}, {max}], but is {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid input value: {0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. The sort is stable, i.e. equal values
/// keep their original order.
pub fn argsort<T: std::cmp::PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => {
            indices.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(Ordering::Equal))
        }
        SortOrder::Descending => {
            indices.sort_by(|&a, &b| x[b].partial_cmp(&x[a]).unwrap_or(Ordering::Equal))
        }
    }
    indices
}

/// argsort_desc_with_tolerance returns the indices that sort `primary` in descending order, where
/// values closer than `tol` to the head of their group count as tied. Tied entries are ordered by
/// `secondary` (descending). Grouping happens after a strict sort, so the result is always a
/// consistent total order even though tolerance comparisons are not transitive.
pub fn argsort_desc_with_tolerance(primary: &[f64], secondary: &[f64], tol: f64) -> Vec<usize> {
    if primary.len() != secondary.len() {
        panic!("Number of items in primary and secondary must be equal!")
    }

    let sorted = argsort(primary, SortOrder::Descending);
    let mut result = Vec::with_capacity(sorted.len());
    let mut group_start = 0;

    while group_start < sorted.len() {
        let head = primary[sorted[group_start]];
        let mut group_end = group_start + 1;

        while group_end < sorted.len() && (head - primary[sorted[group_end]]).abs() < tol {
            group_end += 1;
        }

        let mut group = sorted[group_start..group_end].to_vec();
        group.sort_by(|&a, &b| {
            secondary[b]
                .partial_cmp(&secondary[a])
                .unwrap_or(Ordering::Equal)
        });
        result.extend(group);
        group_start = group_end;
    }

    result
}

/// lin_interp returns the linearly interpolated value at x for given discrete data points xp, fp.
/// xp must be increasing. Inspired by numpy.interp.
pub fn lin_interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    if xp.len() != fp.len() || xp.is_empty() {
        panic!("Number of items in xp and fp must be equal and non-zero!")
    }

    if x <= xp[0] {
        return fp[0];
    }

    for i in 1..xp.len() {
        if x <= xp[i] {
            return fp[i - 1] + (x - xp[i - 1]) * (fp[i] - fp[i - 1]) / (xp[i] - xp[i - 1]);
        }
    }

    fp[fp.len() - 1]
}
