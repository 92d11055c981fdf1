//! Monthly SIP aggregation over a NAV series.

use crate::core::returns::NavPoint;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Reduces a daily or monthly NAV series to one representative sample per
/// calendar month: the first sample observed in each (year, month).
///
/// When the series spans more months than `expected`, the list is truncated
/// to the first `expected` entries so the most recent partial period is
/// dropped rather than the oldest installment.
pub fn monthly_samples(points: &[NavPoint], expected: usize) -> Vec<NavPoint> {
    let mut samples: Vec<NavPoint> = Vec::new();
    let mut last_month: Option<(i32, u32)> = None;

    for point in points {
        let month = (point.date.year(), point.date.month());
        if last_month != Some(month) {
            samples.push(point.clone());
            last_month = Some(month);
        }
    }

    samples.truncate(expected);
    samples
}

/// Outcome of a fixed monthly investment across the sampled months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipProjection {
    pub installments: usize,
    pub monthly_amount: f64,
    pub total_invested: f64,
    pub total_units: f64,
    pub current_value: f64,
    pub gain: f64,
    pub return_pct: f64,
}

/// Projects a monthly SIP of `monthly_amount` bought at each sampled NAV and
/// valued at `current_nav`.
///
/// Returns `None` for degenerate input (no installments, non-positive amount
/// or NAV) so callers can exclude the period instead of dividing by zero.
pub fn project(monthly: &[NavPoint], monthly_amount: f64, current_nav: f64) -> Option<SipProjection> {
    if monthly.is_empty() || monthly_amount <= 0.0 || current_nav <= 0.0 {
        return None;
    }
    if monthly.iter().any(|p| p.nav <= 0.0) {
        return None;
    }

    let installments = monthly.len();
    let total_units: f64 = monthly.iter().map(|p| monthly_amount / p.nav).sum();
    let total_invested = monthly_amount * installments as f64;
    let current_value = total_units * current_nav;
    let gain = current_value - total_invested;

    Some(SipProjection {
        installments,
        monthly_amount,
        total_invested,
        total_units,
        current_value,
        gain,
        return_pct: gain / total_invested * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(y: i32, m: u32, d: u32, nav: f64) -> NavPoint {
        NavPoint {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            nav,
        }
    }

    #[test]
    fn test_first_sample_of_each_month_wins() {
        let points = vec![
            point(2024, 1, 3, 100.0),
            point(2024, 1, 17, 101.0),
            point(2024, 2, 1, 102.0),
            point(2024, 2, 15, 103.0),
            point(2024, 3, 4, 104.0),
        ];
        let samples = monthly_samples(&points, 12);

        assert_eq!(
            samples,
            vec![
                point(2024, 1, 3, 100.0),
                point(2024, 2, 1, 102.0),
                point(2024, 3, 4, 104.0),
            ]
        );
    }

    #[test]
    fn test_truncates_most_recent_partial_period() {
        // 13 monthly samples against an expected count of 12.
        let points: Vec<NavPoint> = (0..13u32)
            .map(|i| point(2023 + (i / 12) as i32, i % 12 + 1, 1, 100.0 + f64::from(i)))
            .collect();
        let samples = monthly_samples(&points, 12);

        assert_eq!(samples.len(), 12);
        assert_eq!(samples.first(), Some(&point(2023, 1, 1, 100.0)));
        // The 13th (most recent) sample is the one dropped.
        assert_eq!(samples.last(), Some(&point(2023, 12, 1, 111.0)));
    }

    #[test]
    fn test_month_key_spans_years() {
        let points = vec![point(2023, 12, 29, 100.0), point(2024, 12, 2, 110.0)];
        let samples = monthly_samples(&points, 60);
        // Same month number, different year: both kept.
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_projection_arithmetic() {
        let monthly = vec![
            point(2024, 1, 1, 100.0),
            point(2024, 2, 1, 110.0),
            point(2024, 3, 1, 120.0),
        ];
        let projection = project(&monthly, 1000.0, 130.0).unwrap();

        assert_eq!(projection.installments, 3);
        assert_eq!(projection.total_invested, 3000.0);
        let expected_units = 1000.0 / 100.0 + 1000.0 / 110.0 + 1000.0 / 120.0;
        assert!((projection.total_units - expected_units).abs() < 1e-9);
        assert!((projection.current_value - expected_units * 130.0).abs() < 1e-9);
        assert!((projection.gain - (projection.current_value - 3000.0)).abs() < 1e-9);
        assert!(
            (projection.return_pct - projection.gain / 3000.0 * 100.0).abs() < 1e-9
        );
    }

    #[test]
    fn test_projection_invested_uses_installment_count() {
        let monthly: Vec<NavPoint> = (1..=12).map(|m| point(2024, m, 1, 50.0)).collect();
        let projection = project(&monthly, 500.0, 50.0).unwrap();

        assert_eq!(projection.total_invested, 500.0 * 12.0);
        assert!((projection.return_pct).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs_are_none() {
        assert!(project(&[], 1000.0, 100.0).is_none());
        assert!(project(&[point(2024, 1, 1, 100.0)], 0.0, 100.0).is_none());
        assert!(project(&[point(2024, 1, 1, 100.0)], 1000.0, 0.0).is_none());
        assert!(project(&[point(2024, 1, 1, 0.0)], 1000.0, 100.0).is_none());
    }
}
