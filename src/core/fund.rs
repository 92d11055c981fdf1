//! Persisted fund records.
//!
//! Every metadata attribute is declared explicitly and independently nullable;
//! search-derived fields default to empty strings, matching what the provider
//! guarantees.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One mutual fund share class, keyed by the provider's scheme code.
///
/// The scheme code is globally unique and stable across syncs; it is the
/// upsert key for this record and for [`FundReturns`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub scheme_code: String,
    pub scheme_name: String,
    pub scheme_name_unique: Option<String>,
    pub amc: String,
    pub amc_code: Option<String>,
    pub category: String,
    pub sub_category: String,
    pub plan_name: String,
    pub option_name: String,

    // NAV
    pub current_nav: Option<f64>,
    pub nav_date: Option<NaiveDate>,

    // Fund details
    pub aum: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub fund_manager: Option<String>,
    pub benchmark: Option<String>,
    pub date_of_inception: Option<String>,

    // Risk
    pub risk_profile: Option<String>,
    pub risk_rating: Option<f64>,
    pub riskometer: Option<String>,
    pub vr_rating: Option<String>,

    // Investment terms
    pub min_investment: Option<f64>,
    pub min_sip_investment: Option<f64>,
    pub exit_load: ExitLoad,

    // Other
    pub isin: Option<String>,
    pub objective: Option<String>,
    pub scheme_doc_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Exit load terms: period in days, rate in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExitLoad {
    pub period: Option<i64>,
    pub rate: Option<f64>,
    pub remark: Option<String>,
}

/// Point returns for one fund; horizons without sufficient history are null.
/// Recomputed wholesale on each sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundReturns {
    pub scheme_code: String,
    pub return_1y: Option<f64>,
    pub return_3y: Option<f64>,
    pub return_5y: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// A distinct (category, sub-category) pair observed across funds.
/// Derived and denormalized, never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub sub_category: Option<String>,
}
