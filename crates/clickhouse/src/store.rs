//! Storage seam between ingestion, the HTTP API and ClickHouse.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashboard_core::{
    AdAccount, Campaign, CampaignStatus, DailyMetricRecord, DateWindow, Result, SyncRun,
};

use crate::client::ClickHouseClient;
use crate::{insert, query};

/// Persistent store for daily metrics and the entities they belong to.
///
/// Writes are upserts: a record for an existing `(entity_id, date)`
/// replaces the stored one.
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn upsert_records(&self, records: &[DailyMetricRecord]) -> Result<usize>;

    /// Records in `window`; `entity_ids` restricts to those entities.
    async fn fetch_records(
        &self,
        window: &DateWindow,
        entity_ids: Option<&[String]>,
    ) -> Result<Vec<DailyMetricRecord>>;

    async fn upsert_campaigns(&self, campaigns: &[Campaign]) -> Result<usize>;

    async fn upsert_accounts(&self, accounts: &[AdAccount]) -> Result<usize>;

    async fn list_campaigns(
        &self,
        account_id: Option<&str>,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<Campaign>>;

    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>>;

    async fn list_accounts(&self) -> Result<Vec<AdAccount>>;

    async fn campaign_ids_for_account(&self, account_id: &str) -> Result<Vec<String>>;

    async fn record_sync_run(&self, run: &SyncRun) -> Result<()>;

    async fn last_sync_run(&self) -> Result<Option<SyncRun>>;
}

/// [`MetricStore`] backed by ClickHouse.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: Arc<ClickHouseClient>,
}

impl ClickHouseStore {
    pub fn new(client: Arc<ClickHouseClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ClickHouseClient> {
        &self.client
    }
}

#[async_trait]
impl MetricStore for ClickHouseStore {
    async fn upsert_records(&self, records: &[DailyMetricRecord]) -> Result<usize> {
        insert::insert_daily_metrics(&self.client, records, Utc::now()).await
    }

    async fn fetch_records(
        &self,
        window: &DateWindow,
        entity_ids: Option<&[String]>,
    ) -> Result<Vec<DailyMetricRecord>> {
        query::fetch_daily_metrics(&self.client, window, entity_ids).await
    }

    async fn upsert_campaigns(&self, campaigns: &[Campaign]) -> Result<usize> {
        insert::insert_campaigns(&self.client, campaigns, Utc::now()).await
    }

    async fn upsert_accounts(&self, accounts: &[AdAccount]) -> Result<usize> {
        insert::insert_ad_accounts(&self.client, accounts, Utc::now()).await
    }

    async fn list_campaigns(
        &self,
        account_id: Option<&str>,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<Campaign>> {
        query::list_campaigns(&self.client, account_id, status).await
    }

    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>> {
        query::get_campaign(&self.client, campaign_id).await
    }

    async fn list_accounts(&self) -> Result<Vec<AdAccount>> {
        query::list_ad_accounts(&self.client).await
    }

    async fn campaign_ids_for_account(&self, account_id: &str) -> Result<Vec<String>> {
        query::campaign_ids_for_account(&self.client, account_id).await
    }

    async fn record_sync_run(&self, run: &SyncRun) -> Result<()> {
        insert::insert_sync_run(&self.client, run).await
    }

    async fn last_sync_run(&self) -> Result<Option<SyncRun>> {
        query::last_sync_run(&self.client).await
    }
}
