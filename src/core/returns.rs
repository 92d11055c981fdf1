//! Return computations over NAV time series.

use crate::core::error::AppError;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point returns are only accepted when the matched historical sample lies
/// strictly within this many days of the nominal horizon.
const TOLERANCE_DAYS: i64 = 60;

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_nav: f64,
    pub end_nav: f64,
    pub absolute_return: f64,
    pub annualized_return: f64,
    pub min_nav: f64,
    pub max_nav: f64,
    pub total_points: usize,
}

/// Summarizes a NAV series: absolute and annualized return, NAV extremes.
///
/// Callers are expected to pass a date-sorted series, but the input is sorted
/// defensively. When the elapsed time is zero or negative the annualized
/// return falls back to the absolute return instead of producing NaN.
pub fn series_summary(points: &mut [NavPoint]) -> Result<SeriesSummary, AppError> {
    if points.is_empty() {
        return Err(AppError::EmptySeries);
    }
    points.sort_by_key(|p| p.date);
    let first = &points[0];
    let last = &points[points.len() - 1];

    let absolute_return = (last.nav - first.nav) / first.nav * 100.0;
    let years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR;
    let annualized_return = if years > 0.0 {
        ((last.nav / first.nav).powf(1.0 / years) - 1.0) * 100.0
    } else {
        absolute_return
    };

    let (min_nav, max_nav) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        (lo.min(p.nav), hi.max(p.nav))
    });

    Ok(SeriesSummary {
        start_date: first.date,
        end_date: last.date,
        start_nav: first.nav,
        end_nav: last.nav,
        absolute_return,
        annualized_return,
        min_nav,
        max_nav,
        total_points: points.len(),
    })
}

/// 1Y/3Y/5Y point returns; a horizon is `None` when no sample falls within
/// the tolerance window of its target date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointReturns {
    pub return_1y: Option<f64>,
    pub return_3y: Option<f64>,
    pub return_5y: Option<f64>,
}

impl PointReturns {
    pub fn is_empty(&self) -> bool {
        self.return_1y.is_none() && self.return_3y.is_none() && self.return_5y.is_none()
    }
}

/// Computes point returns from a raw date -> NAV mapping and an as-of NAV.
///
/// For each horizon, the historical NAV is the sample closest to
/// `today - N years`. The 1 year horizon uses the absolute return; 3 and 5
/// years use CAGR with the nominal horizon, not the actual elapsed time to
/// the matched sample.
pub fn point_returns(
    history: &BTreeMap<NaiveDate, f64>,
    current_nav: f64,
    today: NaiveDate,
) -> PointReturns {
    if current_nav <= 0.0 {
        return PointReturns::default();
    }

    let nav_years_ago = |years: u32| -> Option<f64> {
        let target = today.checked_sub_months(Months::new(years * 12))?;
        let (date, nav) = history
            .iter()
            .min_by_key(|(date, _)| (**date - target).num_days().abs())?;
        let off_target = (*date - target).num_days().abs();
        (off_target < TOLERANCE_DAYS && *nav > 0.0).then_some(*nav)
    };

    PointReturns {
        return_1y: nav_years_ago(1).map(|nav| (current_nav / nav - 1.0) * 100.0),
        return_3y: nav_years_ago(3).map(|nav| cagr(current_nav, nav, 3.0)),
        return_5y: nav_years_ago(5).map(|nav| cagr(current_nav, nav, 5.0)),
    }
}

fn cagr(current_nav: f64, start_nav: f64, years: f64) -> f64 {
    ((current_nav / start_nav).powf(1.0 / years) - 1.0) * 100.0
}
