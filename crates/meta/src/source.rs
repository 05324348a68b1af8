//! Abstraction over where synced data comes from.

use async_trait::async_trait;
use dashboard_core::{AdAccount, Campaign, CampaignStatus, DailyMetricRecord, DateWindow, Result};

use crate::client::MetaAdsClient;

/// Source of accounts, campaigns and daily insights.
///
/// Implemented by [`MetaAdsClient`]; tests substitute an in-memory source.
#[async_trait]
pub trait InsightsSource: Send + Sync {
    async fn ad_accounts(&self) -> Result<Vec<AdAccount>>;

    async fn campaigns(
        &self,
        account_id: &str,
        statuses: &[CampaignStatus],
    ) -> Result<Vec<Campaign>>;

    async fn campaign_insights(
        &self,
        campaign_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<DailyMetricRecord>>;
}

#[async_trait]
impl InsightsSource for MetaAdsClient {
    async fn ad_accounts(&self) -> Result<Vec<AdAccount>> {
        self.get_ad_accounts().await
    }

    async fn campaigns(
        &self,
        account_id: &str,
        statuses: &[CampaignStatus],
    ) -> Result<Vec<Campaign>> {
        self.get_campaigns(account_id, statuses).await
    }

    async fn campaign_insights(
        &self,
        campaign_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<DailyMetricRecord>> {
        self.get_campaign_insights(campaign_id, window).await
    }
}
