use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ApiConfig {
    #[serde(default = "default_base_api_urls")]
    pub base_api_urls: Vec<String>,
    #[serde(default = "default_base_live_api_urls")]
    pub base_live_api_urls: Vec<String>,
    #[serde(default = "default_base_live_api_urls")]
    pub base_play_info_api_urls: Vec<String>,
    #[serde(default = "default_base_app_urls")]
    pub base_app_urls: Vec<String>,
    /// Per request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Extra headers sent with every request, e.g. `Cookie`
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Exponential backoff bounded by a wall-clock deadline.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RetryConfig {
    /// Stop retrying once this many milliseconds have passed since the first attempt
    #[serde(default = "default_retry_deadline")]
    pub deadline_ms: u64,
    /// Wait before the second attempt, doubled after every failure
    #[serde(default = "default_retry_initial_wait")]
    pub initial_wait_ms: u64,
}

fn default_base_api_urls() -> Vec<String> {
    vec!["https://api.bilibili.com".to_string()]
}

fn default_base_live_api_urls() -> Vec<String> {
    vec!["https://api.live.bilibili.com".to_string()]
}

fn default_base_app_urls() -> Vec<String> {
    vec!["https://app.bilibili.com".to_string()]
}

fn default_timeout() -> u64 {
    10
}

fn default_retry_deadline() -> u64 {
    5000
}

fn default_retry_initial_wait() -> u64 {
    100
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_api_urls: default_base_api_urls(),
            base_live_api_urls: default_base_live_api_urls(),
            base_play_info_api_urls: default_base_live_api_urls(),
            base_app_urls: default_base_app_urls(),
            timeout: default_timeout(),
            retry: RetryConfig::default(),
            headers: HashMap::new(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_retry_deadline(),
            initial_wait_ms: default_retry_initial_wait(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Point every host list at a single base url.
    pub fn with_single_host(mut self, base_url: &str) -> Self {
        let hosts = vec![base_url.to_string()];
        self.base_api_urls = hosts.clone();
        self.base_live_api_urls = hosts.clone();
        self.base_play_info_api_urls = hosts.clone();
        self.base_app_urls = hosts;
        self
    }
}

impl RetryConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Wait after the `attempt`-th failure, counting from zero.
    pub fn wait_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.initial_wait_ms.saturating_mul(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: ApiConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.base_api_urls, vec!["https://api.bilibili.com"]);
        assert_eq!(
            config.base_play_info_api_urls,
            vec!["https://api.live.bilibili.com"]
        );
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.retry.deadline(), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_wait() {
        let retry = RetryConfig::default();
        assert_eq!(retry.wait_for_attempt(0), Duration::from_millis(100));
        assert_eq!(retry.wait_for_attempt(1), Duration::from_millis(200));
        assert_eq!(retry.wait_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn test_with_single_host() {
        let config = ApiConfig::default().with_single_host("http://127.0.0.1:8080");
        assert_eq!(config.base_app_urls, vec!["http://127.0.0.1:8080"]);
        assert_eq!(config.base_live_api_urls, vec!["http://127.0.0.1:8080"]);
    }
}
