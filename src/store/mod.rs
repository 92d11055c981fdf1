//! Embedded persistence for funds, returns and categories.
//!
//! One fjall keyspace with a partition per record kind. Values are JSON so
//! the on-disk layout survives field additions. Writes buffer in memory;
//! callers checkpoint with [`FundStore::persist`] at sync boundaries.

use anyhow::{Context, Result};
use chrono::Utc;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::core::fund::{Category, Fund, FundReturns};

const FUNDS_PARTITION: &str = "funds";
const RETURNS_PARTITION: &str = "fund_returns";
const CATEGORIES_PARTITION: &str = "categories";

// Separates category name from sub-category in the key without colliding
// with either.
const CATEGORY_KEY_SEP: char = '\u{1f}';

pub struct FundStore {
    keyspace: Keyspace,
    funds: PartitionHandle,
    returns: PartitionHandle,
    categories: PartitionHandle,
}

impl FundStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let funds = keyspace.open_partition(FUNDS_PARTITION, PartitionCreateOptions::default())?;
        let returns =
            keyspace.open_partition(RETURNS_PARTITION, PartitionCreateOptions::default())?;
        let categories =
            keyspace.open_partition(CATEGORIES_PARTITION, PartitionCreateOptions::default())?;

        debug!(path = %path.display(), "Opened fund store");
        Ok(FundStore {
            keyspace,
            funds,
            returns,
            categories,
        })
    }

    /// Inserts or updates a fund keyed by scheme code. An existing record
    /// keeps its `created_at`; `updated_at` is always refreshed.
    pub fn upsert_fund(&self, mut fund: Fund) -> Result<()> {
        if let Some(existing) = self.fund(&fund.scheme_code)? {
            fund.created_at = existing.created_at;
        }
        fund.updated_at = Utc::now();

        let value = serde_json::to_vec(&fund)?;
        self.funds.insert(fund.scheme_code.as_bytes(), value)?;
        Ok(())
    }

    pub fn fund(&self, scheme_code: &str) -> Result<Option<Fund>> {
        match self.funds.get(scheme_code.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn all_funds(&self) -> Result<Vec<Fund>> {
        let mut funds = Vec::new();
        for item in self.funds.iter() {
            let (_, value) = item?;
            funds.push(serde_json::from_slice(&value)?);
        }
        Ok(funds)
    }

    pub fn upsert_returns(&self, returns: FundReturns) -> Result<()> {
        let value = serde_json::to_vec(&returns)?;
        self.returns.insert(returns.scheme_code.as_bytes(), value)?;
        Ok(())
    }

    pub fn returns(&self, scheme_code: &str) -> Result<Option<FundReturns>> {
        match self.returns.get(scheme_code.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Records a (category, sub-category) pair if it is new. Returns whether
    /// an insert happened.
    pub fn add_category(&self, category: &Category) -> Result<bool> {
        let key = format!(
            "{}{}{}",
            category.name,
            CATEGORY_KEY_SEP,
            category.sub_category.as_deref().unwrap_or("")
        );
        if self.categories.contains_key(key.as_bytes())? {
            return Ok(false);
        }
        let value = serde_json::to_vec(category)?;
        self.categories.insert(key.as_bytes(), value)?;
        Ok(true)
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        let mut categories = Vec::new();
        for item in self.categories.iter() {
            let (_, value) = item?;
            categories.push(serde_json::from_slice(&value)?);
        }
        Ok(categories)
    }

    /// Flushes buffered writes to disk.
    pub fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist fund store")?;
        Ok(())
    }
}
