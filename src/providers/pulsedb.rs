//! PulseDB partner API client.
//!
//! Every endpoint is a POST whose body and response both wrap their payload
//! in a `data` envelope. Requests past login carry the session token in the
//! body, not a header. Tokens are valid for 24 hours upstream; we renew one
//! hour early rather than special-casing an expiry response mid-flight.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::{AppError, PeriodWindow};
use crate::providers::FundDataSource;
use crate::providers::util::with_retry;

const SESSION_TTL: Duration = Duration::from_secs(23 * 60 * 60);
const RETRIES: usize = 3;
const RETRY_DELAY_MS: u64 = 500;

const LOGIN_ENDPOINT: &str = "/rest/api/v1/partner_login";
const SEARCH_ENDPOINT: &str = "/rest/api/v1/mf/search";
const CATEGORIES_ENDPOINT: &str = "/rest/api/v1/mf/asset_categories";
const METADATA_ENDPOINT: &str = "/rest/api/v1/mf/metadata";
const NAV_HISTORY_ENDPOINT: &str = "/rest/api/v1/mf/nav-history";

/// One search hit. Field names follow the wire format.
#[derive(Debug, Clone, Deserialize)]
pub struct FundSummary {
    pub scheme_code: String,
    pub scheme_name: String,
    #[serde(default)]
    pub amc_name: String,
    #[serde(default)]
    pub asset_category: String,
    #[serde(default)]
    pub asset_sub_category: String,
    #[serde(default)]
    pub plan_name: String,
    #[serde(default)]
    pub option_name: String,
    pub isin_dividend_payout_or_growth: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxnInfo {
    pub min_invest: Option<f64>,
    pub min_invest_sip: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExitLoad {
    pub exit_load_period: Option<i64>,
    pub exit_load_rate: Option<f64>,
    pub exit_load_period_remark: Option<String>,
}

/// Detail record for one scheme. The expense ratio arrives under a key with
/// literal parentheses and an ampersand in it, hence the renames.
#[derive(Debug, Clone, Deserialize)]
pub struct FundMetadata {
    pub scheme_name_unique: Option<String>,
    pub amc_code: Option<String>,
    pub nav: Option<f64>,
    pub nav_date: Option<String>,
    pub fund_size: Option<f64>,
    #[serde(rename = "expense_ratio(s)_&_(d)", alias = "expense_ratio")]
    pub expense_ratio: Option<f64>,
    pub fund_manager: Option<String>,
    pub benchmark: Option<String>,
    pub date_of_inception: Option<String>,
    pub risk_profile: Option<String>,
    pub risk_rating: Option<f64>,
    pub riskometer: Option<String>,
    pub vr_rating: Option<String>,
    #[serde(default)]
    pub txn_info: TxnInfo,
    #[serde(default)]
    pub exit_load: ExitLoad,
    pub objective: Option<String>,
    pub scheme_doc_url: Option<String>,
    pub isin_dividend_payout_or_growth: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    auth: String,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    mutual_funds: Vec<FundSummary>,
}

#[derive(Debug, Deserialize)]
struct CategoriesData {
    #[serde(default)]
    asset_categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NavHistoryData {
    #[serde(default)]
    nav_history: BTreeMap<String, f64>,
}

struct Session {
    token: String,
    expires_at: Instant,
}

/// Authenticated PulseDB client. Cheap to share behind an `Arc`; the session
/// token is renewed lazily under a mutex so concurrent callers log in once.
pub struct PulseDbClient {
    base_url: String,
    partner: String,
    key: String,
    http: Client,
    session: Mutex<Option<Session>>,
}

impl PulseDbClient {
    pub fn new(base_url: &str, partner: &str, key: &str) -> Self {
        PulseDbClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            partner: partner.to_string(),
            key: key.to_string(),
            http: Client::new(),
            session: Mutex::new(None),
        }
    }

    /// Returns a live session token, logging in if none is cached or the
    /// cached one is near expiry.
    async fn ensure_session(&self) -> Result<String, AppError> {
        let mut session = self.session.lock().await;
        if let Some(current) = session.as_ref()
            && current.expires_at > Instant::now()
        {
            return Ok(current.token.clone());
        }

        debug!("Logging in to PulseDB");
        let url = format!("{}{}", self.base_url, LOGIN_ENDPOINT);
        let body = json!({ "partner": self.partner, "key": self.key });
        let response = with_retry(
            || self.http.post(&url).json(&body).send(),
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(|e| AppError::UpstreamAuth(format!("Login request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamAuth(format!(
                "Login rejected with status {}",
                response.status()
            )));
        }

        let envelope: Envelope<LoginData> = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamAuth(format!("Malformed login response: {e}")))?;
        let auth = envelope
            .data
            .map(|d| d.auth)
            .ok_or_else(|| AppError::UpstreamAuth("Login response carried no token".into()))?;

        *session = Some(Session {
            token: auth.clone(),
            expires_at: Instant::now() + SESSION_TTL,
        });
        Ok(auth)
    }

    /// POSTs `params` plus the session token to `endpoint` and unwraps the
    /// `data` envelope. `Ok(None)` means the provider answered with an empty
    /// envelope, which it uses for "no such record".
    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        mut params: Value,
    ) -> Result<Option<T>, AppError> {
        let auth = self.ensure_session().await?;
        if let Some(body) = params.as_object_mut() {
            body.insert("auth".to_string(), Value::String(auth));
        }

        let url = format!("{}{}", self.base_url, endpoint);
        let response = with_retry(
            || self.http.post(&url).json(&params).send(),
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(|e| AppError::UpstreamRequest {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamRequest {
                endpoint: endpoint.to_string(),
                message: format!("status {}", response.status()),
            });
        }

        let envelope: Envelope<T> =
            response.json().await.map_err(|e| AppError::UpstreamRequest {
                endpoint: endpoint.to_string(),
                message: format!("malformed response: {e}"),
            })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl FundDataSource for PulseDbClient {
    async fn search_funds(&self, query: &str) -> Result<Vec<FundSummary>, AppError> {
        let data: Option<SearchData> = self
            .request(SEARCH_ENDPOINT, json!({ "search_text": query }))
            .await?;
        Ok(data.map(|d| d.mutual_funds).unwrap_or_default())
    }

    async fn asset_categories(&self) -> Result<Vec<String>, AppError> {
        let data: Option<CategoriesData> = self.request(CATEGORIES_ENDPOINT, json!({})).await?;
        Ok(data.map(|d| d.asset_categories).unwrap_or_default())
    }

    async fn fund_metadata(&self, scheme_code: &str) -> Result<Option<FundMetadata>, AppError> {
        // The detail payload is keyed by scheme code even for a single-code
        // request.
        let data: Option<HashMap<String, FundMetadata>> = self
            .request(METADATA_ENDPOINT, json!({ "scheme_code": scheme_code }))
            .await?;
        Ok(data.and_then(|mut map| map.remove(scheme_code)))
    }

    async fn nav_history(
        &self,
        scheme_code: &str,
        window: &PeriodWindow,
    ) -> Result<BTreeMap<NaiveDate, f64>, AppError> {
        let params = json!({
            "scheme_code": scheme_code,
            "frequency": window.frequency.to_string(),
            "from": window.from.format("%Y-%m-%d").to_string(),
            "to": window.to.format("%Y-%m-%d").to_string(),
        });
        let data: Option<NavHistoryData> = self.request(NAV_HISTORY_ENDPOINT, params).await?;
        // An absent envelope means the provider has no history at all for
        // the scheme, as opposed to a present-but-empty series.
        let data = data.ok_or_else(|| AppError::NoDataAvailable(scheme_code.to_string()))?;

        let mut series = BTreeMap::new();
        for (date_str, nav) in data.nav_history {
            match NaiveDate::parse_from_str(&date_str, "%Y-%m-%d") {
                Ok(date) => {
                    series.insert(date, nav);
                }
                Err(_) => warn!(scheme_code, date = %date_str, "Skipping unparseable NAV date"),
            }
        }
        Ok(series)
    }
}
