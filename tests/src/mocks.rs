//! Mock implementations for testing.

use async_trait::async_trait;
use clickhouse_client::MetricStore;
use dashboard_core::error::{DbErrorCode, UpstreamErrorCode};
use dashboard_core::{
    AdAccount, Campaign, CampaignStatus, DailyMetricRecord, DateWindow, Error, RecordSet, Result,
    SyncRun,
};
use meta_ads::InsightsSource;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory store with the same upsert semantics as ClickHouse.
///
/// Records are keyed by `(entity_id, date)`; a later write replaces the
/// stored record.
#[derive(Clone, Default)]
pub struct MockStore {
    records: Arc<Mutex<RecordSet>>,
    campaigns: Arc<Mutex<Vec<Campaign>>>,
    accounts: Arc<Mutex<Vec<AdAccount>>>,
    runs: Arc<Mutex<Vec<SyncRun>>>,
    /// Simulate read failures if set.
    should_fail: Arc<Mutex<bool>>,
    fetched_windows: Arc<Mutex<Vec<DateWindow>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<DailyMetricRecord>) -> Self {
        let store = Self::new();
        store.seed_records(records);
        store
    }

    pub fn seed_records(&self, records: Vec<DailyMetricRecord>) {
        let mut set = self.records.lock();
        for record in records {
            set.upsert(record);
        }
    }

    pub fn seed_campaigns(&self, campaigns: Vec<Campaign>) {
        *self.campaigns.lock() = campaigns;
    }

    pub fn seed_accounts(&self, accounts: Vec<AdAccount>) {
        *self.accounts.lock() = accounts;
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn records(&self) -> Vec<DailyMetricRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn sync_runs(&self) -> Vec<SyncRun> {
        self.runs.lock().clone()
    }

    /// Number of `fetch_records` calls that reached the store.
    pub fn fetch_count(&self) -> usize {
        self.fetched_windows.lock().len()
    }

    /// Windows requested from the store, in call order.
    pub fn fetched_windows(&self) -> Vec<DateWindow> {
        self.fetched_windows.lock().clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check_available(&self) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::database(DbErrorCode::StoreFailed, "mock store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricStore for MockStore {
    async fn upsert_records(&self, records: &[DailyMetricRecord]) -> Result<usize> {
        self.check_available()?;
        self.seed_records(records.to_vec());
        Ok(records.len())
    }

    async fn fetch_records(
        &self,
        window: &DateWindow,
        entity_ids: Option<&[String]>,
    ) -> Result<Vec<DailyMetricRecord>> {
        self.check_available()?;
        self.fetched_windows.lock().push(*window);
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| window.contains(r.date))
            .filter(|r| entity_ids.map_or(true, |ids| ids.contains(&r.entity_id)))
            .cloned()
            .collect())
    }

    async fn upsert_campaigns(&self, campaigns: &[Campaign]) -> Result<usize> {
        self.check_available()?;
        let mut stored = self.campaigns.lock();
        for campaign in campaigns {
            stored.retain(|c| c.campaign_id != campaign.campaign_id);
            stored.push(campaign.clone());
        }
        Ok(campaigns.len())
    }

    async fn upsert_accounts(&self, accounts: &[AdAccount]) -> Result<usize> {
        self.check_available()?;
        let mut stored = self.accounts.lock();
        for account in accounts {
            stored.retain(|a| a.account_id != account.account_id);
            stored.push(account.clone());
        }
        Ok(accounts.len())
    }

    async fn list_campaigns(
        &self,
        account_id: Option<&str>,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<Campaign>> {
        self.check_available()?;
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .lock()
            .iter()
            .filter(|c| account_id.map_or(true, |id| c.account_id == id))
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| a.name.cmp(&b.name).then(a.campaign_id.cmp(&b.campaign_id)));
        Ok(campaigns)
    }

    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>> {
        self.check_available()?;
        Ok(self
            .campaigns
            .lock()
            .iter()
            .find(|c| c.campaign_id == campaign_id)
            .cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<AdAccount>> {
        self.check_available()?;
        Ok(self.accounts.lock().clone())
    }

    async fn campaign_ids_for_account(&self, account_id: &str) -> Result<Vec<String>> {
        self.check_available()?;
        let mut ids: Vec<String> = self
            .campaigns
            .lock()
            .iter()
            .filter(|c| c.account_id == account_id)
            .map(|c| c.campaign_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn record_sync_run(&self, run: &SyncRun) -> Result<()> {
        self.runs.lock().push(run.clone());
        Ok(())
    }

    async fn last_sync_run(&self) -> Result<Option<SyncRun>> {
        Ok(self.runs.lock().last().cloned())
    }
}

/// Scripted Meta source.
///
/// Returns the configured accounts, campaigns and insights. Insights are
/// clipped to the requested window like the Graph API does.
#[derive(Clone, Default)]
pub struct MockInsightsSource {
    accounts: Arc<Mutex<Vec<AdAccount>>>,
    campaigns: Arc<Mutex<Vec<Campaign>>>,
    insights: Arc<Mutex<HashMap<String, Vec<DailyMetricRecord>>>>,
    failing_campaigns: Arc<Mutex<Vec<String>>>,
    token_expired: Arc<Mutex<bool>>,
    insight_calls: Arc<Mutex<usize>>,
}

impl MockInsightsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, account: AdAccount) {
        self.accounts.lock().push(account);
    }

    pub fn add_campaign(&self, campaign: Campaign, insights: Vec<DailyMetricRecord>) {
        self.insights
            .lock()
            .insert(campaign.campaign_id.clone(), insights);
        self.campaigns.lock().push(campaign);
    }

    /// Replace the insights returned for a campaign.
    pub fn set_insights(&self, campaign_id: &str, insights: Vec<DailyMetricRecord>) {
        self.insights.lock().insert(campaign_id.to_string(), insights);
    }

    /// Make insight requests for `campaign_id` fail with a transient error.
    pub fn fail_campaign(&self, campaign_id: &str) {
        self.failing_campaigns.lock().push(campaign_id.to_string());
    }

    /// Make every request fail as if the access token had expired.
    pub fn expire_token(&self) {
        *self.token_expired.lock() = true;
    }

    pub fn insight_calls(&self) -> usize {
        *self.insight_calls.lock()
    }

    fn check_token(&self) -> Result<()> {
        if *self.token_expired.lock() {
            return Err(Error::upstream(
                UpstreamErrorCode::TokenExpired,
                "Error validating access token: Session has expired",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl InsightsSource for MockInsightsSource {
    async fn ad_accounts(&self) -> Result<Vec<AdAccount>> {
        self.check_token()?;
        Ok(self.accounts.lock().clone())
    }

    async fn campaigns(
        &self,
        account_id: &str,
        statuses: &[CampaignStatus],
    ) -> Result<Vec<Campaign>> {
        self.check_token()?;
        Ok(self
            .campaigns
            .lock()
            .iter()
            .filter(|c| c.account_id == account_id)
            .filter(|c| statuses.is_empty() || statuses.contains(&c.status))
            .cloned()
            .collect())
    }

    async fn campaign_insights(
        &self,
        campaign_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<DailyMetricRecord>> {
        *self.insight_calls.lock() += 1;
        self.check_token()?;
        if self.failing_campaigns.lock().iter().any(|id| id == campaign_id) {
            return Err(Error::upstream(
                UpstreamErrorCode::RequestFailed,
                "(#17) User request limit reached",
            ));
        }
        Ok(self
            .insights
            .lock()
            .get(campaign_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| window.contains(r.date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
