//! Meta Marketing API configuration.

use serde::{Deserialize, Serialize};

/// Graph API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    /// Graph API host
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Graph API version path segment, e.g. `v18.0`
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// User or system-user access token. Empty disables syncing.
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Items per page requested from list endpoints
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    /// Upper bound on followed `paging.next` links per listing
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v18.0".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_page_limit() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    50
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            access_token: String::new(),
            app_id: String::new(),
            app_secret: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            page_limit: default_page_limit(),
            max_pages: default_max_pages(),
        }
    }
}

impl MetaConfig {
    /// Whether an access token has been provided.
    pub fn is_configured(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}
