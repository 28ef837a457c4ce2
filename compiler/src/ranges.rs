use serde_derive::{Deserialize, Serialize};

/// An inclusive run of representable values, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: i64,
    pub end: i64,
}

impl Range {
    pub fn is_unit(&self) -> bool {
        self.end == self.start
    }
}

/// Sort `values`, then coalesce consecutive runs into the smallest possible
/// list of [`Range`]s. Used to describe which numeric values an enum or
/// fixed variant's members actually occupy.
pub fn find_ranges(values: &[i64]) -> Vec<Range> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut start = sorted[0];
    let mut prev = sorted[0];
    for &v in &sorted[1..] {
        if v == prev + 1 {
            prev = v;
            continue;
        }
        ranges.push(Range { start, end: prev });
        start = v;
        prev = v;
    }
    ranges.push(Range { start, end: prev });
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_run_collapses_to_one_range() {
        assert_eq!(find_ranges(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]), vec![Range { start: 0, end: 10 }]);
    }

    #[test]
    fn gap_splits_into_two_ranges() {
        assert_eq!(
            find_ranges(&[0, 1, 2, 3, 4, 6, 7, 8, 9, 10]),
            vec![Range { start: 0, end: 4 }, Range { start: 6, end: 10 }]
        );
    }

    #[test]
    fn single_value_is_a_unit_range() {
        assert_eq!(find_ranges(&[0]), vec![Range { start: 0, end: 0 }]);
        assert!(Range { start: 0, end: 0 }.is_unit());
    }

    #[test]
    fn empty_input_yields_no_ranges() {
        assert_eq!(find_ranges(&[]), Vec::<Range>::new());
    }

    #[test]
    fn unsorted_duplicated_input_is_normalized() {
        assert_eq!(find_ranges(&[5, 3, 4, 3, 5]), vec![Range { start: 3, end: 5 }]);
    }
}
