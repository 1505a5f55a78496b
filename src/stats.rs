//! Pure numeric helpers over in-memory daily series.
//!
//! Everything here is a plain function of its inputs: no shared state, no
//! I/O, deterministic output.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::model::{DateRange, UsageRecord};

/// Tolerance applied before rounding up, so that float noise such as
/// `0.1 * 3.0 = 0.30000000000000004` does not add a whole unit.
const ROUNDING_TOLERANCE: f64 = 1e-9;

/// Total usage on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Calendar grouping used for seasonality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// ISO week (year, week number).
    Week,
    /// Calendar month (year, month).
    Month,
}

impl Grouping {
    fn key(self, date: NaiveDate) -> (i32, u32) {
        match self {
            Grouping::Week => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            Grouping::Month => (date.year(), date.month()),
        }
    }
}

/// Bucket records into one entry per calendar day of `range`.
///
/// Days without records are present with zero usage. Records outside the
/// range are ignored.
pub fn daily_series<'a, I>(records: I, range: DateRange) -> Vec<DailyUsage>
where
    I: IntoIterator<Item = &'a UsageRecord>,
{
    let mut series: Vec<DailyUsage> = range
        .start
        .iter_days()
        .take(range.days())
        .map(|date| DailyUsage {
            date,
            quantity: 0.0,
        })
        .collect();

    for record in records {
        if !range.contains(record.date) {
            continue;
        }
        let index = (record.date - range.start).num_days() as usize;
        series[index].quantity += record.quantity;
    }

    series
}

/// Arithmetic mean; zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Bessel-corrected sample standard deviation; zero when fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Least-squares slope of `values` against their index (0, 1, 2, ...).
///
/// Zero when fewer than two values.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        covariance += dx * (y - y_mean);
        variance += dx * dx;
    }

    covariance / variance
}

/// Mean daily usage of each calendar group, in chronological order.
pub fn group_means(series: &[DailyUsage], grouping: Grouping) -> Vec<f64> {
    let mut groups: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();

    for day in series {
        let entry = groups.entry(grouping.key(day.date)).or_insert((0.0, 0));
        entry.0 += day.quantity;
        entry.1 += 1;
    }

    groups
        .into_values()
        .map(|(total, days)| total / days as f64)
        .collect()
}

/// Daily quantities bucketed by calendar month (year, month), in order.
pub fn month_buckets(series: &[DailyUsage]) -> BTreeMap<(i32, u32), Vec<f64>> {
    let mut buckets: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    for day in series {
        buckets
            .entry(Grouping::Month.key(day.date))
            .or_default()
            .push(day.quantity);
    }
    buckets
}

/// Mean daily usage per month of the year (1-12), pooling all years.
pub fn month_of_year_means(series: &[DailyUsage]) -> Vec<(u32, f64)> {
    let mut months: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for day in series {
        let entry = months.entry(day.date.month()).or_insert((0.0, 0));
        entry.0 += day.quantity;
        entry.1 += 1;
    }

    months
        .into_iter()
        .map(|(month, (total, days))| (month, total / days as f64))
        .collect()
}

/// Inverse of the standard normal CDF (the quantile function).
///
/// Uses Acklam's rational approximation, relative error below 1.15e-9 over
/// the whole open interval. Returns `None` unless `0 < p < 1`.
pub fn inverse_normal_cdf(p: f64) -> Option<f64> {
    if !(p > 0.0 && p < 1.0) {
        return None;
    }

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239e0,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838e0,
        -2.549_732_539_343_734e0,
        4.374_664_141_464_968e0,
        2.938_163_982_698_783e0,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996e0,
        3.754_408_661_907_416e0,
    ];

    // Break-points between the tail and central approximations.
    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    let z = if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    };

    Some(z)
}

/// Round `value` up to the next multiple of `unit`.
///
/// Negative values become zero. A non-positive or non-finite `unit`
/// disables rounding.
pub fn round_up_to_unit(value: f64, unit: f64) -> f64 {
    let value = value.max(0.0);
    if !(unit.is_finite() && unit > 0.0) {
        return value;
    }
    let units = (value / unit - ROUNDING_TOLERANCE).ceil().max(0.0);
    units * unit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_daily_series_fills_missing_days() {
        let records = vec![
            UsageRecord::new("A", date(2024, 1, 1), 3.0),
            UsageRecord::new("A", date(2024, 1, 1), 2.0),
            UsageRecord::new("A", date(2024, 1, 4), 7.0),
            UsageRecord::new("A", date(2024, 2, 1), 100.0),
        ];
        let range = DateRange {
            start: date(2024, 1, 1),
            end: date(2024, 1, 5),
        };

        let series = daily_series(&records, range);
        let quantities: Vec<f64> = series.iter().map(|d| d.quantity).collect();

        assert_eq!(quantities, vec![5.0, 0.0, 0.0, 7.0, 0.0]);
        assert_eq!(series[3].date, date(2024, 1, 4));
    }

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_close(mean(&values), 5.0, 1e-12);
        // Sample (n - 1) variance is 32 / 7.
        assert_close(sample_std_dev(&values), (32.0_f64 / 7.0).sqrt(), 1e-12);
    }

    #[test]
    fn test_std_dev_single_value_is_zero() {
        assert_eq!(sample_std_dev(&[42.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_linear_slope() {
        assert_close(linear_slope(&[1.0, 3.0, 5.0, 7.0]), 2.0, 1e-12);
        assert_close(linear_slope(&[10.0, 10.0, 10.0]), 0.0, 1e-12);
        assert_close(linear_slope(&[9.0, 6.0, 3.0]), -3.0, 1e-12);
        assert_eq!(linear_slope(&[5.0]), 0.0);
    }

    #[test]
    fn test_group_means_by_month() {
        let records = vec![
            UsageRecord::new("A", date(2024, 1, 31), 31.0),
            UsageRecord::new("A", date(2024, 2, 1), 58.0),
        ];
        let range = DateRange {
            start: date(2024, 1, 1),
            end: date(2024, 2, 29),
        };
        let series = daily_series(&records, range);

        let means = group_means(&series, Grouping::Month);

        assert_eq!(means.len(), 2);
        assert_close(means[0], 1.0, 1e-12);
        assert_close(means[1], 2.0, 1e-12);
    }

    #[test]
    fn test_group_means_by_iso_week() {
        // 2024-01-01 is a Monday.
        let range = DateRange {
            start: date(2024, 1, 1),
            end: date(2024, 1, 10),
        };
        let series = daily_series(std::iter::empty(), range);

        assert_eq!(group_means(&series, Grouping::Week).len(), 2);
    }

    #[test]
    fn test_month_of_year_means_pool_years() {
        let records = vec![
            UsageRecord::new("A", date(2023, 1, 15), 31.0),
            UsageRecord::new("A", date(2024, 1, 15), 93.0),
        ];
        let range = DateRange {
            start: date(2023, 1, 1),
            end: date(2024, 1, 31),
        };
        let series = daily_series(&records, range);

        let means = month_of_year_means(&series);

        assert_eq!(means.len(), 12);
        assert_eq!(means[0].0, 1);
        // 124 units over 62 January days.
        assert_close(means[0].1, 2.0, 1e-12);
        assert_eq!(month_buckets(&series).len(), 13);
    }

    #[test]
    fn test_inverse_normal_cdf_known_quantiles() {
        assert_close(inverse_normal_cdf(0.5).unwrap(), 0.0, 1e-12);
        assert_close(inverse_normal_cdf(0.95).unwrap(), 1.644_853_626_951_472, 1e-6);
        assert_close(inverse_normal_cdf(0.99).unwrap(), 2.326_347_874_040_841, 1e-6);
        assert_close(inverse_normal_cdf(0.999).unwrap(), 3.090_232_306_167_813, 1e-6);
        assert_close(inverse_normal_cdf(0.01).unwrap(), -2.326_347_874_040_841, 1e-6);
    }

    #[test]
    fn test_inverse_normal_cdf_is_monotonic() {
        let mut previous = f64::NEG_INFINITY;
        for i in 1..1000 {
            let z = inverse_normal_cdf(i as f64 / 1000.0).unwrap();
            assert!(z > previous);
            previous = z;
        }
    }

    #[test]
    fn test_inverse_normal_cdf_rejects_bounds() {
        assert!(inverse_normal_cdf(0.0).is_none());
        assert!(inverse_normal_cdf(1.0).is_none());
        assert!(inverse_normal_cdf(-0.5).is_none());
        assert!(inverse_normal_cdf(f64::NAN).is_none());
    }

    #[test]
    fn test_round_up_to_unit() {
        assert_eq!(round_up_to_unit(24.1, 1.0), 25.0);
        assert_eq!(round_up_to_unit(25.0, 1.0), 25.0);
        assert_close(round_up_to_unit(0.1 * 3.0, 0.1), 0.3, 1e-12);
        assert_eq!(round_up_to_unit(-3.0, 1.0), 0.0);
        assert_eq!(round_up_to_unit(7.25, 0.0), 7.25);
    }
}
