use std::cmp::Ordering;

use crate::metric::Metric;

/// Arithmetic mean. Undefined for empty input.
pub fn mean(values: &[f64]) -> Metric {
    Metric::ratio(values.iter().sum::<f64>(), values.len() as f64)
}

/// Population standard deviation around a pre-computed mean.
/// Undefined for empty input.
pub fn stddev(values: &[f64], mean: Metric) -> Metric {
    let Some(mean) = mean.value() else {
        return Metric::Undefined;
    };
    let variance = Metric::ratio(
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>(),
        values.len() as f64,
    );
    match variance {
        Metric::Defined(v) => Metric::Defined(v.sqrt()),
        Metric::Undefined => Metric::Undefined,
    }
}

/// Median, averaging the two middle values for even-length input.
pub fn median(values: &[f64]) -> Metric {
    if values.is_empty() {
        return Metric::Undefined;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Metric::Defined((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Metric::Defined(sorted[mid])
    }
}

pub fn min(values: &[f64]) -> Metric {
    values
        .iter()
        .copied()
        .min_by(f64::total_cmp)
        .map_or(Metric::Undefined, Metric::Defined)
}

pub fn max(values: &[f64]) -> Metric {
    values
        .iter()
        .copied()
        .max_by(f64::total_cmp)
        .map_or(Metric::Undefined, Metric::Defined)
}

/// Descending order for metrics, with undefined values last.
pub fn cmp_desc(a: Metric, b: Metric) -> Ordering {
    match (a, b) {
        (Metric::Defined(x), Metric::Defined(y)) => y.total_cmp(&x),
        (Metric::Defined(_), Metric::Undefined) => Ordering::Less,
        (Metric::Undefined, Metric::Defined(_)) => Ordering::Greater,
        (Metric::Undefined, Metric::Undefined) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs_are_undefined() {
        assert_eq!(mean(&[]), Metric::Undefined);
        assert_eq!(median(&[]), Metric::Undefined);
        assert_eq!(stddev(&[], Metric::Undefined), Metric::Undefined);
        assert_eq!(min(&[]), Metric::Undefined);
        assert_eq!(max(&[]), Metric::Undefined);
    }

    #[test]
    fn test_population_stddev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert_eq!(m, Metric::Defined(5.0));
        assert_eq!(stddev(&values, m), Metric::Defined(2.0));
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Metric::Defined(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Metric::Defined(2.5));
    }

    #[test]
    fn test_cmp_desc_puts_undefined_last() {
        let mut values = vec![
            Metric::Undefined,
            Metric::Defined(1.0),
            Metric::Defined(3.0),
        ];
        values.sort_by(|a, b| cmp_desc(*a, *b));
        assert_eq!(
            values,
            vec![Metric::Defined(3.0), Metric::Defined(1.0), Metric::Undefined]
        );
    }
}
