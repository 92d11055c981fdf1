//! Display periods and their mapping to concrete date ranges.

use crate::core::error::AppError;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "3Y")]
    ThreeYears,
    #[serde(rename = "5Y")]
    FiveYears,
    #[serde(rename = "MAX")]
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "month")]
    Month,
}

/// A resolved period: concrete date range plus sampling frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub frequency: Frequency,
}

impl Period {
    /// Periods served by the returns calculator, ascending.
    pub const CALCULATOR: [Period; 4] = [
        Period::SixMonths,
        Period::OneYear,
        Period::ThreeYears,
        Period::FiveYears,
    ];

    /// Resolves the period against a reference date.
    ///
    /// Short periods sample daily; long ones sample monthly to bound response
    /// size and provider load. The provider has no inception-to-date query, so
    /// `MAX` is a fixed 10 year lookback.
    pub fn resolve(&self, today: NaiveDate) -> PeriodWindow {
        let (from, frequency) = match self {
            Period::SixMonths => (sub_months(today, 6), Frequency::Day),
            Period::OneYear => (sub_months(today, 12), Frequency::Day),
            Period::ThreeYears => (sub_months(today, 36), Frequency::Month),
            Period::FiveYears => (sub_months(today, 60), Frequency::Month),
            Period::Max => (sub_months(today, 120), Frequency::Month),
        };
        PeriodWindow {
            from,
            to: today,
            frequency,
        }
    }

    /// Expected SIP installment count for the period, one per month.
    pub fn expected_installments(&self) -> Option<usize> {
        match self {
            Period::SixMonths => Some(6),
            Period::OneYear => Some(12),
            Period::ThreeYears => Some(36),
            Period::FiveYears => Some(60),
            Period::Max => None,
        }
    }
}

fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Period::SixMonths => "6M",
                Period::OneYear => "1Y",
                Period::ThreeYears => "3Y",
                Period::FiveYears => "5Y",
                Period::Max => "MAX",
            }
        )
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "6M" => Ok(Period::SixMonths),
            "1Y" => Ok(Period::OneYear),
            "3Y" => Ok(Period::ThreeYears),
            "5Y" => Ok(Period::FiveYears),
            "MAX" => Ok(Period::Max),
            _ => Err(AppError::InvalidPeriod(s.to_string())),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Frequency::Day => "day",
                Frequency::Month => "month",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_frequencies() {
        let today = day(2024, 6, 15);

        for (period, months, frequency) in [
            (Period::SixMonths, 6, Frequency::Day),
            (Period::OneYear, 12, Frequency::Day),
            (Period::ThreeYears, 36, Frequency::Month),
            (Period::FiveYears, 60, Frequency::Month),
            (Period::Max, 120, Frequency::Month),
        ] {
            let window = period.resolve(today);
            assert!(window.from < window.to, "{period}: from must precede to");
            assert_eq!(window.to, today);
            assert_eq!(
                window.from,
                today.checked_sub_months(Months::new(months)).unwrap()
            );
            assert_eq!(window.frequency, frequency);
        }
    }

    #[test]
    fn test_parse_valid_periods() {
        assert_eq!("6M".parse::<Period>().unwrap(), Period::SixMonths);
        assert_eq!("1y".parse::<Period>().unwrap(), Period::OneYear);
        assert_eq!("3Y".parse::<Period>().unwrap(), Period::ThreeYears);
        assert_eq!("5Y".parse::<Period>().unwrap(), Period::FiveYears);
        assert_eq!("max".parse::<Period>().unwrap(), Period::Max);
    }

    #[test]
    fn test_parse_invalid_period() {
        for bad in ["2Y", "10Y", "", "weekly"] {
            let err = bad.parse::<Period>().unwrap_err();
            assert!(matches!(err, AppError::InvalidPeriod(_)), "{bad}");
        }
    }

    #[test]
    fn test_expected_installments() {
        assert_eq!(Period::SixMonths.expected_installments(), Some(6));
        assert_eq!(Period::OneYear.expected_installments(), Some(12));
        assert_eq!(Period::ThreeYears.expected_installments(), Some(36));
        assert_eq!(Period::FiveYears.expected_installments(), Some(60));
        assert_eq!(Period::Max.expected_installments(), None);
    }

    #[test]
    fn test_wire_labels() {
        assert_eq!(serde_json::to_string(&Period::SixMonths).unwrap(), "\"6M\"");
        assert_eq!(serde_json::to_string(&Frequency::Month).unwrap(), "\"month\"");
        assert_eq!(Period::Max.to_string(), "MAX");
    }
}
