//! Graph API HTTP client.

use std::time::{Duration, Instant};

use dashboard_core::error::UpstreamErrorCode;
use dashboard_core::{
    AdAccount, Campaign, CampaignStatus, DailyMetricRecord, DateWindow, Error, Result,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use telemetry::metrics;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::MetaConfig;
use crate::ids::account_node_id;
use crate::types::{AccountNode, CampaignNode, GraphErrorEnvelope, InsightNode, Page};

/// Graph API error code for an invalid or expired access token.
const TOKEN_ERROR_CODE: i64 = 190;

const ACCOUNT_FIELDS: &str =
    "id,account_id,name,currency,account_status,amount_spent,balance,timezone_name";
const CAMPAIGN_FIELDS: &str =
    "id,name,objective,status,daily_budget,lifetime_budget,created_time";
const INSIGHT_FIELDS: &str =
    "campaign_id,date_start,date_stop,impressions,reach,frequency,clicks,spend,actions,action_values,conversion_values";

/// Client for the Meta Marketing (Graph) API.
#[derive(Clone)]
pub struct MetaAdsClient {
    http: reqwest::Client,
    base: Url,
    config: MetaConfig,
}

impl MetaAdsClient {
    pub fn new(config: MetaConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .and_then(|u| u.join(&format!("{}/", config.api_version.trim_matches('/'))))
            .map_err(|e| Error::validation(format!("meta base_url: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        info!(base = %base, "Created Meta Ads client");

        Ok(Self { http, base, config })
    }

    pub fn config(&self) -> &MetaConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::validation(format!("invalid Graph path '{}': {}", path, e)))
    }

    /// Ad accounts readable with the configured token.
    pub async fn get_ad_accounts(&self) -> Result<Vec<AdAccount>> {
        let mut url = self.endpoint("me/adaccounts")?;
        url.query_pairs_mut()
            .append_pair("fields", ACCOUNT_FIELDS)
            .append_pair("limit", &self.config.page_limit.to_string());

        let nodes: Vec<AccountNode> = self.get_all(url).await?;
        let accounts = nodes
            .into_iter()
            .map(AccountNode::into_account)
            .collect::<Result<Vec<_>>>()?;

        info!(count = accounts.len(), "Fetched ad accounts");
        Ok(accounts)
    }

    /// Campaigns of one account, optionally filtered by status.
    pub async fn get_campaigns(
        &self,
        account_id: &str,
        statuses: &[CampaignStatus],
    ) -> Result<Vec<Campaign>> {
        let node_id = account_node_id(account_id)?;
        let mut url = self.endpoint(&format!("{}/campaigns", node_id))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("fields", CAMPAIGN_FIELDS)
                .append_pair("limit", &self.config.page_limit.to_string());
            if !statuses.is_empty() {
                let values: Vec<&str> = statuses.iter().map(CampaignStatus::as_str).collect();
                let filtering = json!([{"field": "effective_status", "operator": "IN", "value": values}]);
                query.append_pair("filtering", &filtering.to_string());
            }
        }

        let nodes: Vec<CampaignNode> = self.get_all(url).await?;
        let campaigns = nodes
            .into_iter()
            .map(|n| n.into_campaign(&node_id))
            .collect::<Result<Vec<_>>>()?;

        info!(account_id = %node_id, count = campaigns.len(), "Fetched campaigns");
        Ok(campaigns)
    }

    /// Daily insights of one campaign over `window`.
    ///
    /// Rows that fail validation are skipped and counted, so one bad day
    /// does not drop the whole campaign.
    pub async fn get_campaign_insights(
        &self,
        campaign_id: &str,
        window: &DateWindow,
    ) -> Result<Vec<DailyMetricRecord>> {
        let mut url = self.endpoint(&format!("{}/insights", campaign_id.trim()))?;
        let time_range = json!({
            "since": window.start().format("%Y-%m-%d").to_string(),
            "until": window.end().format("%Y-%m-%d").to_string(),
        });
        url.query_pairs_mut()
            .append_pair("fields", INSIGHT_FIELDS)
            .append_pair("level", "campaign")
            .append_pair("time_increment", "1")
            .append_pair("time_range", &time_range.to_string())
            .append_pair("limit", &self.config.page_limit.to_string());

        let nodes: Vec<InsightNode> = self.get_all(url).await?;
        let mut records = Vec::with_capacity(nodes.len());
        for node in nodes {
            let date = node.date_start.clone();
            match node.into_record(campaign_id) {
                Ok(record) => records.push(record),
                Err(e) => {
                    metrics().records_rejected.inc();
                    warn!(campaign_id = %campaign_id, date = %date, "Skipping insight row: {}", e);
                }
            }
        }

        debug!(campaign_id = %campaign_id, count = records.len(), "Fetched insights");
        Ok(records)
    }

    /// Verifies the token by reading `/me`.
    pub async fn check_token(&self) -> Result<()> {
        let mut url = self.endpoint("me")?;
        url.query_pairs_mut().append_pair("fields", "id");
        self.get_json::<serde_json::Value>(url).await.map(|_| ())
    }

    /// Follows `paging.next` until exhausted or `max_pages` is reached.
    async fn get_all<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(url).await?;
            items.extend(page.data);
            pages += 1;

            if pages >= self.config.max_pages {
                warn!(pages, "Stopping pagination at page limit");
                break;
            }

            next = match page.paging.and_then(|p| p.next) {
                Some(link) => Some(
                    Url::parse(&link)
                        .map_err(|e| upstream_failed(format!("bad paging link: {}", e)))?,
                ),
                None => None,
            };
        }

        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(&self, mut url: Url) -> Result<T> {
        let has_token = url.query_pairs().any(|(k, _)| k == "access_token");
        if !has_token {
            url.query_pairs_mut()
                .append_pair("access_token", &self.config.access_token);
        }

        let start = Instant::now();
        metrics().meta_requests.inc();

        let response = self.http.get(url).send().await.map_err(|e| {
            metrics().meta_request_errors.inc();
            upstream_failed(format!("request failed: {}", e.without_url()))
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            metrics().meta_request_errors.inc();
            upstream_failed(format!("reading response: {}", e.without_url()))
        })?;
        metrics().meta_latency_ms.observe_since(start);

        if !status.is_success() {
            metrics().meta_request_errors.inc();
            return Err(map_error_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| upstream_failed(format!("unexpected response shape: {}", e)))
    }
}

fn upstream_failed(msg: impl Into<String>) -> Error {
    Error::upstream(UpstreamErrorCode::RequestFailed, msg)
}

/// Maps a Graph API error body to an upstream error.
pub(crate) fn map_error_body(status: u16, body: &str) -> Error {
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(envelope) => {
            let err = envelope.error;
            let msg = format!(
                "Graph API {} (code {}, status {}): {}",
                err.kind, err.code, status, err.message
            );
            if err.code == TOKEN_ERROR_CODE {
                Error::upstream(UpstreamErrorCode::TokenExpired, msg)
            } else {
                upstream_failed(msg)
            }
        }
        Err(_) => upstream_failed(format!("Graph API status {}", status)),
    }
}
