use itertools::{Itertools, MinMaxResult};

pub const GRIDLINE_COUNT: usize = 5;

const PADDING_RATIO: f64 = 0.1;
const GRID_STEP: f64 = 10.0;
const MIN_SPAN: f64 = 10.0;

/// Five evenly spaced horizontal gridlines covering `values`.
///
/// The data range is padded by 10% on each side, then the bounds are snapped
/// outward to multiples of ten. A flat series gets a ten unit span centered on
/// its value. Reaction times are never negative so the floor is clamped at 0.
pub fn gridlines(values: &[u64]) -> Option<[f64; GRIDLINE_COUNT]> {
    let (min, max) = match values.iter().copied().minmax() {
        MinMaxResult::NoElements => return None,
        MinMaxResult::OneElement(v) => (v as f64, v as f64),
        MinMaxResult::MinMax(lo, hi) => (lo as f64, hi as f64),
    };

    let (lower, upper) = if max > min {
        let pad = (max - min) * PADDING_RATIO;
        (min - pad, max + pad)
    } else {
        (min - MIN_SPAN / 2.0, max + MIN_SPAN / 2.0)
    };

    let lower = ((lower / GRID_STEP).floor() * GRID_STEP).max(0.0);
    let upper = (upper / GRID_STEP).ceil() * GRID_STEP;
    let interval = (upper - lower) / (GRIDLINE_COUNT - 1) as f64;

    Some(std::array::from_fn(|i| lower + interval * i as f64))
}

/// (round, ms) points for the results chart, rounds numbered from 1
pub fn chart_points(times: &[u64]) -> Vec<(f64, f64)> {
    times
        .iter()
        .enumerate()
        .map(|(i, &ms)| ((i + 1) as f64, ms as f64))
        .collect()
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gridlines_padded_and_snapped() {
        let lines = gridlines(&[100, 120, 140, 110, 130]).unwrap();
        assert_eq!(lines, [90.0, 105.0, 120.0, 135.0, 150.0]);
    }

    #[test]
    fn test_gridlines_contain_all_values() {
        let data = [187, 243, 201, 356, 222];
        let lines = gridlines(&data).unwrap();
        for w in lines.windows(2) {
            assert!(w[0] < w[1]);
        }
        for &v in &data {
            assert!(lines[0] < v as f64 && (v as f64) < lines[4]);
        }
        assert_eq!(lines[0] % 10.0, 0.0);
        assert_eq!(lines[4] % 10.0, 0.0);
    }

    #[test]
    fn test_gridlines_flat_series() {
        let lines = gridlines(&[200, 200, 200]).unwrap();
        assert_eq!(lines, [190.0, 195.0, 200.0, 205.0, 210.0]);
    }

    #[test]
    fn test_gridlines_single_value_near_zero() {
        let lines = gridlines(&[0]).unwrap();
        assert_eq!(lines[0], 0.0);
        assert_eq!(lines[4], 10.0);
    }

    #[test]
    fn test_gridlines_empty() {
        assert_eq!(gridlines(&[]), None);
    }

    #[test]
    fn test_chart_points() {
        assert_eq!(chart_points(&[180, 220]), vec![(1.0, 180.0), (2.0, 220.0)]);
        assert!(chart_points(&[]).is_empty());
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(105.0), "105");
        assert_eq!(format_label(112.5), "112.5");
    }
}
