//! Request handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::api::AppState;
use crate::core::AppError;
use crate::core::fund::Fund;
use chrono::{NaiveDate, Utc};
use crate::history::{CalculatorData, NavHistoryResponse};
use crate::sync::SyncReport;
use tracing::warn;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct FundListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// Listing projection of a fund record.
#[derive(Debug, Serialize)]
pub struct FundListItem {
    pub scheme_code: String,
    pub scheme_name: String,
    pub amc: String,
    pub category: String,
    pub sub_category: String,
    pub current_nav: Option<f64>,
    pub nav_date: Option<NaiveDate>,
    pub expense_ratio: Option<f64>,
    pub risk_profile: Option<String>,
    pub riskometer: Option<String>,
    pub vr_rating: Option<String>,
    pub aum: Option<f64>,
}

impl From<Fund> for FundListItem {
    fn from(fund: Fund) -> Self {
        FundListItem {
            scheme_code: fund.scheme_code,
            scheme_name: fund.scheme_name,
            amc: fund.amc,
            category: fund.category,
            sub_category: fund.sub_category,
            current_nav: fund.current_nav,
            nav_date: fund.nav_date,
            expense_ratio: fund.expense_ratio,
            risk_profile: fund.risk_profile,
            riskometer: fund.riskometer,
            vr_rating: fund.vr_rating,
            aum: fund.aum,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FundListResponse {
    pub funds: Vec<FundListItem>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Lists stored funds with optional name search and category filter,
/// paginated and sorted by scheme name.
pub async fn list_funds(
    State(state): State<AppState>,
    Query(query): Query<FundListQuery>,
) -> Result<Json<FundListResponse>, AppError> {
    let mut funds = state.store.all_funds()?;
    funds = filter_funds(funds, &query);
    funds.sort_by(|a, b| a.scheme_name.cmp(&b.scheme_name));

    let total = funds.len();
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);
    let total_pages = total.div_ceil(limit);

    let funds = funds
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .map(FundListItem::from)
        .collect();
    Ok(Json(FundListResponse {
        funds,
        total,
        page,
        total_pages,
    }))
}

fn filter_funds(funds: Vec<Fund>, query: &FundListQuery) -> Vec<Fund> {
    let search = query
        .search
        .as_deref()
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty());
    let category = query.category.as_deref().filter(|c| !c.is_empty());

    funds
        .into_iter()
        .filter(|fund| {
            search
                .as_deref()
                .is_none_or(|s| fund.scheme_name.to_lowercase().contains(s))
        })
        .filter(|fund| category.is_none_or(|c| fund.category == c))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct FundDetail {
    #[serde(flatten)]
    pub fund: Fund,
    /// Point returns keyed by horizon label; every horizon is present,
    /// null until a sync has computed it.
    pub returns: BTreeMap<String, Option<f64>>,
}

pub async fn fund_detail(
    State(state): State<AppState>,
    Path(scheme_code): Path<String>,
) -> Result<Json<FundDetail>, AppError> {
    let fund = state
        .store
        .fund(&scheme_code)?
        .ok_or_else(|| AppError::FundNotFound(scheme_code.clone()))?;

    let returns = state.store.returns(&scheme_code)?;
    let returns = BTreeMap::from([
        ("1Y".to_string(), returns.as_ref().and_then(|r| r.return_1y)),
        ("3Y".to_string(), returns.as_ref().and_then(|r| r.return_3y)),
        ("5Y".to_string(), returns.as_ref().and_then(|r| r.return_5y)),
    ]);
    Ok(Json(FundDetail { fund, returns }))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let categories = state.store.categories()?;

    // Group sub-categories under their parent category, sorted.
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for category in categories {
        let subs = grouped.entry(category.name).or_default();
        if let Some(sub) = category.sub_category {
            subs.push(sub);
        }
    }
    let categories: Vec<Value> = grouped
        .into_iter()
        .map(|(name, mut subs)| {
            subs.sort();
            json!({ "name": name, "sub_categories": subs })
        })
        .collect();
    Ok(Json(json!({ "categories": categories })))
}

#[derive(Debug, Default, Deserialize)]
pub struct NavHistoryQuery {
    pub period: Option<String>,
}

pub async fn nav_history(
    State(state): State<AppState>,
    Path(scheme_code): Path<String>,
    Query(query): Query<NavHistoryQuery>,
) -> Result<Json<NavHistoryResponse>, AppError> {
    let period = query.period.as_deref().unwrap_or("1Y").parse()?;
    let response = state.history.nav_history(&scheme_code, period).await?;
    Ok(Json(response))
}

#[derive(Debug, Default, Deserialize)]
pub struct CalculatorQuery {
    /// Monthly SIP amount; when present each period carries a projection.
    pub amount: Option<f64>,
}

pub async fn calculator_data(
    State(state): State<AppState>,
    Path(scheme_code): Path<String>,
    Query(query): Query<CalculatorQuery>,
) -> Result<Json<CalculatorData>, AppError> {
    let mut data = state.history.calculator_data(&scheme_code).await?;
    if let Some(amount) = query.amount {
        data = data.with_sip(amount);
    }
    Ok(Json(data))
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    pub limit: Option<usize>,
}

/// Runs a sync inline and reports the outcome. Long-running by design; the
/// scheduled daily job covers routine refreshes.
pub async fn trigger_sync(
    State(state): State<AppState>,
    body: Option<Json<SyncRequest>>,
) -> Result<Json<SyncReport>, AppError> {
    let limit = body
        .and_then(|Json(req)| req.limit)
        .unwrap_or(state.default_sync_limit);
    // The fund sync still runs when the category list is unavailable.
    if let Err(err) = state.sync.sync_categories().await {
        warn!("Category sync failed: {err}");
    }
    let report = state.sync.sync_funds(limit).await?;
    Ok(Json(report))
}
