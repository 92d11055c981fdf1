//! Pulls fund listings, metadata and returns from the provider into the
//! local store.
//!
//! A sync walks the configured AMCs, keeps regular growth share classes, and
//! upserts each fund with its metadata and point returns. One bad fund never
//! aborts the run; it is counted and logged. The store is checkpointed every
//! few funds so an interrupted sync keeps its progress.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::fund::{Category, ExitLoad as ExitLoadInfo, Fund, FundReturns};
use crate::core::returns::point_returns;
use crate::core::{AppError, Period};
use crate::providers::{FundDataSource, FundMetadata, FundSummary};
use crate::store::FundStore;

const PERSIST_EVERY: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    pub duration_secs: f64,
}

pub struct SyncPipeline {
    source: Arc<dyn FundDataSource>,
    store: Arc<FundStore>,
    targets: Vec<String>,
}

impl SyncPipeline {
    pub fn new(source: Arc<dyn FundDataSource>, store: Arc<FundStore>, targets: Vec<String>) -> Self {
        SyncPipeline {
            source,
            store,
            targets,
        }
    }

    /// Refreshes the provider's asset category list.
    pub async fn sync_categories(&self) -> Result<usize, AppError> {
        let names = self.source.asset_categories().await?;
        let mut added = 0;
        for name in &names {
            if self.store.add_category(&Category {
                name: name.clone(),
                sub_category: None,
            })? {
                added += 1;
            }
        }
        self.store.persist()?;
        debug!(total = names.len(), added, "Synced asset categories");
        Ok(added)
    }

    /// Syncs up to `limit` funds spread across the configured AMCs.
    pub async fn sync_funds(&self, limit: usize) -> Result<SyncReport, AppError> {
        let started = Instant::now();
        let per_amc = limit.div_ceil(self.targets.len().max(1));
        let today = Utc::now().date_naive();

        let mut seen: HashSet<String> = HashSet::new();
        let mut synced = 0;
        let mut failed = 0;

        for amc in &self.targets {
            let summaries = match self.source.search_funds(amc).await {
                Ok(summaries) => summaries,
                Err(err) => {
                    warn!(%amc, "AMC search failed: {err}");
                    failed += 1;
                    continue;
                }
            };

            let candidates: Vec<FundSummary> = summaries
                .into_iter()
                .filter(|s| is_target_amc(amc, &s.amc_name))
                .filter(is_regular_growth)
                .filter(|s| seen.insert(s.scheme_code.clone()))
                .take(per_amc)
                .collect();
            debug!(%amc, count = candidates.len(), "Selected funds for sync");

            for summary in candidates {
                let scheme_code = summary.scheme_code.clone();
                match self.sync_single(summary, today).await {
                    Ok(()) => synced += 1,
                    Err(err) => {
                        warn!(%scheme_code, "Fund sync failed: {err}");
                        failed += 1;
                    }
                }
                if (synced + failed) % PERSIST_EVERY == 0 {
                    self.store.persist()?;
                }
            }
        }

        self.store.persist()?;
        let report = SyncReport {
            synced,
            failed,
            duration_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            synced = report.synced,
            failed = report.failed,
            duration_secs = report.duration_secs,
            "Sync finished"
        );
        Ok(report)
    }

    /// Upserts one fund. Missing or failing metadata degrades to a bare
    /// record; missing history just leaves returns absent.
    async fn sync_single(&self, summary: FundSummary, today: NaiveDate) -> Result<(), AppError> {
        let mut fund = fund_from_summary(&summary);
        match self.source.fund_metadata(&fund.scheme_code).await {
            Ok(Some(metadata)) => apply_metadata(&mut fund, metadata),
            Ok(None) => debug!(scheme_code = %fund.scheme_code, "No metadata for fund"),
            Err(err) => warn!(
                scheme_code = %fund.scheme_code,
                "Metadata fetch failed, storing summary only: {err}"
            ),
        }

        self.store.upsert_fund(fund.clone())?;

        if let Some(current_nav) = fund.current_nav {
            let window = Period::FiveYears.resolve(today);
            match self.source.nav_history(&fund.scheme_code, &window).await {
                Ok(history) => {
                    let returns = point_returns(&history, current_nav, today);
                    if !returns.is_empty() {
                        self.store.upsert_returns(FundReturns {
                            scheme_code: fund.scheme_code.clone(),
                            return_1y: returns.return_1y,
                            return_3y: returns.return_3y,
                            return_5y: returns.return_5y,
                            updated_at: Utc::now(),
                        })?;
                    }
                }
                Err(err) => warn!(
                    scheme_code = %fund.scheme_code,
                    "NAV history fetch failed, skipping returns: {err}"
                ),
            }
        }

        if !fund.category.is_empty() {
            self.store.add_category(&Category {
                name: fund.category.clone(),
                sub_category: (!fund.sub_category.is_empty()).then(|| fund.sub_category.clone()),
            })?;
        }
        Ok(())
    }
}

/// Search results for an AMC name include other houses whose scheme names
/// merely mention it; keep only true members.
fn is_target_amc(target: &str, amc_name: &str) -> bool {
    amc_name.to_uppercase().contains(&target.to_uppercase())
}

/// Keeps one share class per scheme: the regular plan, growth option.
fn is_regular_growth(summary: &FundSummary) -> bool {
    !summary.plan_name.is_empty()
        && !summary.plan_name.eq_ignore_ascii_case("direct")
        && summary.option_name.eq_ignore_ascii_case("growth")
}

fn fund_from_summary(summary: &FundSummary) -> Fund {
    let now = Utc::now();
    Fund {
        scheme_code: summary.scheme_code.clone(),
        scheme_name: summary.scheme_name.clone(),
        scheme_name_unique: None,
        amc: summary.amc_name.clone(),
        amc_code: None,
        category: summary.asset_category.clone(),
        sub_category: summary.asset_sub_category.clone(),
        plan_name: summary.plan_name.clone(),
        option_name: summary.option_name.clone(),
        current_nav: None,
        nav_date: None,
        aum: None,
        expense_ratio: None,
        fund_manager: None,
        benchmark: None,
        date_of_inception: None,
        risk_profile: None,
        risk_rating: None,
        riskometer: None,
        vr_rating: None,
        min_investment: None,
        min_sip_investment: None,
        exit_load: ExitLoadInfo::default(),
        isin: summary.isin_dividend_payout_or_growth.clone(),
        objective: None,
        scheme_doc_url: None,
        created_at: now,
        updated_at: now,
    }
}

fn apply_metadata(fund: &mut Fund, metadata: FundMetadata) {
    fund.scheme_name_unique = metadata.scheme_name_unique;
    fund.amc_code = metadata.amc_code;
    fund.current_nav = metadata.nav;
    fund.nav_date = metadata
        .nav_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
    fund.aum = metadata.fund_size;
    fund.expense_ratio = metadata.expense_ratio;
    fund.fund_manager = metadata.fund_manager;
    fund.benchmark = metadata.benchmark;
    fund.date_of_inception = metadata.date_of_inception;
    fund.risk_profile = metadata.risk_profile;
    fund.risk_rating = metadata.risk_rating;
    fund.riskometer = metadata.riskometer;
    fund.vr_rating = metadata.vr_rating;
    fund.min_investment = metadata.txn_info.min_invest;
    fund.min_sip_investment = metadata.txn_info.min_invest_sip;
    fund.exit_load = ExitLoadInfo {
        period: metadata.exit_load.exit_load_period,
        rate: metadata.exit_load.exit_load_rate,
        remark: metadata.exit_load.exit_load_period_remark,
    };
    fund.objective = metadata.objective;
    fund.scheme_doc_url = metadata.scheme_doc_url;
    if metadata.isin_dividend_payout_or_growth.is_some() {
        fund.isin = metadata.isin_dividend_payout_or_growth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PeriodWindow;
    use crate::providers::pulsedb::{ExitLoad, TxnInfo};
    use async_trait::async_trait;
    use chrono::Months;
    use std::collections::BTreeMap;

    fn summary(code: &str, name: &str, amc: &str, plan: &str, option: &str) -> FundSummary {
        FundSummary {
            scheme_code: code.to_string(),
            scheme_name: name.to_string(),
            amc_name: amc.to_string(),
            asset_category: "Equity".to_string(),
            asset_sub_category: "Flexi Cap".to_string(),
            plan_name: plan.to_string(),
            option_name: option.to_string(),
            isin_dividend_payout_or_growth: None,
        }
    }

    fn metadata(nav: f64) -> FundMetadata {
        FundMetadata {
            scheme_name_unique: Some("slug".to_string()),
            amc_code: Some("AMC_MF".to_string()),
            nav: Some(nav),
            nav_date: Some("2026-08-25".to_string()),
            fund_size: Some(1000.0),
            expense_ratio: Some(1.2),
            fund_manager: None,
            benchmark: None,
            date_of_inception: None,
            risk_profile: Some("Very High".to_string()),
            risk_rating: None,
            riskometer: None,
            vr_rating: None,
            txn_info: TxnInfo {
                min_invest: Some(100.0),
                min_invest_sip: Some(100.0),
            },
            exit_load: ExitLoad::default(),
            objective: None,
            scheme_doc_url: None,
            isin_dividend_payout_or_growth: Some("INF000000000".to_string()),
        }
    }

    /// Source with fixed search results, metadata for every scheme, and five
    /// years of flat-growth monthly history.
    struct MockSource {
        results: Vec<FundSummary>,
        metadata_fails: bool,
    }

    #[async_trait]
    impl FundDataSource for MockSource {
        async fn search_funds(&self, query: &str) -> Result<Vec<FundSummary>, AppError> {
            Ok(self
                .results
                .iter()
                .filter(|s| is_target_amc(query, &s.amc_name))
                .cloned()
                .collect())
        }

        async fn asset_categories(&self) -> Result<Vec<String>, AppError> {
            Ok(vec!["Equity".to_string(), "Debt".to_string()])
        }

        async fn fund_metadata(&self, _scheme_code: &str) -> Result<Option<FundMetadata>, AppError> {
            if self.metadata_fails {
                return Err(AppError::UpstreamRequest {
                    endpoint: "/metadata".to_string(),
                    message: "boom".to_string(),
                });
            }
            Ok(Some(metadata(200.0)))
        }

        async fn nav_history(
            &self,
            _scheme_code: &str,
            window: &PeriodWindow,
        ) -> Result<BTreeMap<NaiveDate, f64>, AppError> {
            let mut series = BTreeMap::new();
            let mut date = window.from;
            let mut nav = 100.0;
            while date <= window.to {
                series.insert(date, nav);
                nav += 1.0;
                date = match date.checked_add_months(Months::new(1)) {
                    Some(next) => next,
                    None => break,
                };
            }
            Ok(series)
        }
    }

    fn pipeline(source: MockSource, targets: &[&str]) -> (SyncPipeline, Arc<FundStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FundStore::open(dir.path()).unwrap());
        let pipeline = SyncPipeline::new(
            Arc::new(source),
            Arc::clone(&store),
            targets.iter().map(|s| s.to_string()).collect(),
        );
        (pipeline, store, dir)
    }

    #[tokio::test]
    async fn test_sync_keeps_regular_growth_only() {
        let source = MockSource {
            results: vec![
                summary("1", "HDFC A - Growth", "HDFC Mutual Fund", "Regular", "Growth"),
                summary("2", "HDFC B - Direct Growth", "HDFC Mutual Fund", "Direct", "Growth"),
                summary("3", "HDFC C - IDCW", "HDFC Mutual Fund", "Regular", "IDCW"),
                summary("4", "Other Fund", "Axis Mutual Fund", "Regular", "Growth"),
            ],
            metadata_fails: false,
        };
        let (pipeline, store, _dir) = pipeline(source, &["HDFC"]);

        let report = pipeline.sync_funds(10).await.unwrap();
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 0);

        let funds = store.all_funds().unwrap();
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].scheme_code, "1");
        assert_eq!(funds[0].expense_ratio, Some(1.2));
        assert_eq!(funds[0].current_nav, Some(200.0));
    }

    #[tokio::test]
    async fn test_sync_dedupes_across_amc_queries() {
        // The same scheme shows up under both search terms.
        let shared = summary(
            "1",
            "ICICI Prudential Nifty Fund - Growth",
            "ICICI Prudential Mutual Fund",
            "Regular",
            "Growth",
        );
        let source = MockSource {
            results: vec![shared],
            metadata_fails: false,
        };
        let (pipeline, store, _dir) = pipeline(source, &["ICICI", "Prudential"]);

        let report = pipeline.sync_funds(10).await.unwrap();
        assert_eq!(report.synced, 1);
        assert_eq!(store.all_funds().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_per_amc_cap_spreads_limit() {
        let mut results = Vec::new();
        for i in 0..5 {
            results.push(summary(
                &format!("h{i}"),
                &format!("HDFC Fund {i} - Growth"),
                "HDFC Mutual Fund",
                "Regular",
                "Growth",
            ));
            results.push(summary(
                &format!("a{i}"),
                &format!("Axis Fund {i} - Growth"),
                "Axis Mutual Fund",
                "Regular",
                "Growth",
            ));
        }
        let source = MockSource {
            results,
            metadata_fails: false,
        };
        let (pipeline, store, _dir) = pipeline(source, &["HDFC", "Axis"]);

        // limit 4 over 2 AMCs: 2 per AMC.
        let report = pipeline.sync_funds(4).await.unwrap();
        assert_eq!(report.synced, 4);

        let funds = store.all_funds().unwrap();
        assert_eq!(funds.iter().filter(|f| f.amc.contains("HDFC")).count(), 2);
        assert_eq!(funds.iter().filter(|f| f.amc.contains("Axis")).count(), 2);
    }

    #[tokio::test]
    async fn test_metadata_failure_still_upserts_summary() {
        let source = MockSource {
            results: vec![summary(
                "1",
                "HDFC A - Growth",
                "HDFC Mutual Fund",
                "Regular",
                "Growth",
            )],
            metadata_fails: true,
        };
        let (pipeline, store, _dir) = pipeline(source, &["HDFC"]);

        let report = pipeline.sync_funds(10).await.unwrap();
        assert_eq!(report.synced, 1);

        let fund = store.fund("1").unwrap().unwrap();
        assert_eq!(fund.scheme_name, "HDFC A - Growth");
        assert!(fund.current_nav.is_none());
        // No NAV means no returns row either.
        assert!(store.returns("1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sync_computes_point_returns() {
        let source = MockSource {
            results: vec![summary(
                "1",
                "HDFC A - Growth",
                "HDFC Mutual Fund",
                "Regular",
                "Growth",
            )],
            metadata_fails: false,
        };
        let (pipeline, store, _dir) = pipeline(source, &["HDFC"]);

        pipeline.sync_funds(10).await.unwrap();

        let returns = store.returns("1").unwrap().unwrap();
        assert!(returns.return_1y.is_some());
        assert!(returns.return_3y.is_some());
        assert!(returns.return_5y.is_some());
    }

    #[tokio::test]
    async fn test_sync_records_categories() {
        let source = MockSource {
            results: vec![summary(
                "1",
                "HDFC A - Growth",
                "HDFC Mutual Fund",
                "Regular",
                "Growth",
            )],
            metadata_fails: false,
        };
        let (pipeline, store, _dir) = pipeline(source, &["HDFC"]);

        pipeline.sync_categories().await.unwrap();
        pipeline.sync_funds(10).await.unwrap();

        let categories = store.categories().unwrap();
        // Equity and Debt from the provider list, plus (Equity, Flexi Cap)
        // observed on the fund.
        assert_eq!(categories.len(), 3);
        assert!(
            categories
                .iter()
                .any(|c| c.name == "Equity" && c.sub_category.as_deref() == Some("Flexi Cap"))
        );
    }
}
