//! NAV history and SIP calculator responses, memoized over the provider.

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::core::cache::{ResponseCache, SWEEP_INTERVAL};
use crate::core::returns::{SeriesSummary, series_summary};
use crate::core::sip::{SipProjection, monthly_samples, project};
use crate::core::{AppError, Frequency, NavPoint, Period};
use crate::providers::FundDataSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavHistoryResponse {
    pub scheme_code: String,
    pub period: Period,
    pub frequency: Frequency,
    pub data_points: Vec<NavPoint>,
    pub summary: SeriesSummary,
}

/// Monthly samples for one calculator period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodSamples {
    pub start_date: NaiveDate,
    pub start_nav: f64,
    pub end_nav: f64,
    pub months: usize,
    pub monthly_navs: Vec<NavPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip: Option<SipProjection>,
}

/// All calculator periods for one scheme. Periods the provider has no data
/// for are present but null, so clients can tell "no data" from "not asked".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorData {
    pub scheme_code: String,
    pub current_nav: Option<f64>,
    pub current_date: Option<NaiveDate>,
    pub periods: BTreeMap<Period, Option<PeriodSamples>>,
}

impl CalculatorData {
    /// Attaches a SIP projection of `monthly_amount` to every period that has
    /// samples. Applied after the cache so one cached entry serves any amount.
    pub fn with_sip(mut self, monthly_amount: f64) -> Self {
        for samples in self.periods.values_mut().flatten() {
            let valuation_nav = self.current_nav.unwrap_or(samples.end_nav);
            samples.sip = project(&samples.monthly_navs, monthly_amount, valuation_nav);
        }
        self
    }
}

/// Serves NAV history and calculator data with short-TTL caching, so bursts
/// of chart traffic do not fan out to the provider.
pub struct HistoryService {
    source: Arc<dyn FundDataSource>,
    nav_cache: ResponseCache<String, NavHistoryResponse>,
    calc_cache: ResponseCache<String, CalculatorData>,
}

impl HistoryService {
    pub fn new(source: Arc<dyn FundDataSource>) -> Self {
        HistoryService {
            source,
            nav_cache: ResponseCache::new(),
            calc_cache: ResponseCache::new(),
        }
    }

    /// Starts background sweepers for both caches.
    pub fn spawn_sweepers(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.nav_cache.spawn_sweeper(SWEEP_INTERVAL),
            self.calc_cache.spawn_sweeper(SWEEP_INTERVAL),
        ]
    }

    pub async fn nav_history(
        &self,
        scheme_code: &str,
        period: Period,
    ) -> Result<NavHistoryResponse, AppError> {
        let cache_key = format!("nav-history:{scheme_code}:{period}");
        if let Some(cached) = self.nav_cache.get(&cache_key).await {
            return Ok(cached);
        }

        let today = Utc::now().date_naive();
        let window = period.resolve(today);
        // The source reports a wholly absent history itself; an empty series
        // here means every sample was dropped during parsing.
        let series = self.source.nav_history(scheme_code, &window).await?;
        if series.is_empty() {
            return Err(AppError::EmptySeries);
        }

        let mut data_points: Vec<NavPoint> = series
            .into_iter()
            .map(|(date, nav)| NavPoint { date, nav })
            .collect();
        let summary = series_summary(&mut data_points)?;

        let response = NavHistoryResponse {
            scheme_code: scheme_code.to_string(),
            period,
            frequency: window.frequency,
            data_points,
            summary,
        };
        self.nav_cache.put(cache_key, response.clone()).await;
        Ok(response)
    }

    /// Monthly samples for every calculator period, fetched concurrently.
    /// A period that fails or comes back empty is served as null rather than
    /// failing the whole response.
    pub async fn calculator_data(&self, scheme_code: &str) -> Result<CalculatorData, AppError> {
        let cache_key = format!("calculator:{scheme_code}");
        if let Some(cached) = self.calc_cache.get(&cache_key).await {
            return Ok(cached);
        }

        let today = Utc::now().date_naive();
        let fetches = Period::CALCULATOR.iter().map(|period| async move {
            let window = period.resolve(today);
            (*period, self.source.nav_history(scheme_code, &window).await)
        });

        let mut periods: BTreeMap<Period, Option<PeriodSamples>> = BTreeMap::new();
        for (period, result) in join_all(fetches).await {
            let samples = match result {
                Ok(series) => period_samples(period, &series),
                Err(err) => {
                    warn!(scheme_code, %period, "Calculator period fetch failed: {err}");
                    None
                }
            };
            periods.insert(period, samples);
        }

        if periods.values().all(Option::is_none) {
            return Err(AppError::NoDataAvailable(scheme_code.to_string()));
        }

        // Shortest period first. Its end NAV comes from the untruncated
        // series, so it is the freshest price in the window; only the date
        // follows the monthly tail.
        let freshest = periods.values().flatten().next();
        let data = CalculatorData {
            scheme_code: scheme_code.to_string(),
            current_nav: freshest.map(|samples| samples.end_nav),
            current_date: freshest
                .and_then(|samples| samples.monthly_navs.last())
                .map(|p| p.date),
            periods,
        };
        self.calc_cache.put(cache_key, data.clone()).await;
        Ok(data)
    }
}

fn period_samples(period: Period, series: &BTreeMap<NaiveDate, f64>) -> Option<PeriodSamples> {
    let expected = period.expected_installments()?;
    let points: Vec<NavPoint> = series
        .iter()
        .map(|(date, nav)| NavPoint {
            date: *date,
            nav: *nav,
        })
        .collect();
    let monthly = monthly_samples(&points, expected);

    let first = monthly.first()?;
    // The monthly list drops the most recent partial period, so the end NAV
    // is taken from the raw series tail instead of the monthly tail.
    let end = points.last()?;
    Some(PeriodSamples {
        start_date: first.date,
        start_nav: first.nav,
        end_nav: end.nav,
        months: monthly.len(),
        monthly_navs: monthly.clone(),
        sip: None,
    })
}
