use std::time::Duration;

use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::{sleep, Instant};

use crate::config::{ApiConfig, RetryConfig};
use crate::errors::BiliApiError;
use crate::params::{encode_query, Params};
use crate::response::check_response;

pub const BASE_HEADERS: [(&str, &str); 7] = [
    (
        "Accept-Language",
        "zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en;q=0.3,en-US;q=0.2",
    ),
    ("Accept", "application/json, text/plain, */*"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
    ("Origin", "https://live.bilibili.com"),
    ("Pragma", "no-cache"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    ),
];

/// Build a header map, later pairs overriding earlier ones.
pub fn header_map<'a, I>(pairs: I) -> Result<HeaderMap, BiliApiError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let invalid = || BiliApiError::InvalidHeader {
            name: name.to_string(),
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Per-call knobs for a single GET.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    /// Headers added on top of the client headers
    pub headers: HeaderMap,
    /// Turn a non-zero `code` into [`BiliApiError::ApiRequest`]
    pub check_response: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            check_response: true,
        }
    }
}

/// GET helper shared by the app and web clients.
#[derive(Clone, Debug)]
pub struct BaseApi {
    client: Client,
    headers: HeaderMap,
    timeout: Duration,
    retry: RetryConfig,
    room_id: Option<u64>,
}

impl BaseApi {
    pub fn new(client: Client, config: &ApiConfig, headers: HeaderMap) -> Self {
        Self {
            client,
            headers,
            timeout: config.timeout(),
            retry: config.retry.clone(),
            room_id: None,
        }
    }

    /// Tag log lines with the room this client works for.
    pub fn bind_room(mut self, room_id: u64) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn tag(&self) -> String {
        self.room_id
            .map(|room_id| format!("[{room_id}]"))
            .unwrap_or_default()
    }

    async fn get_json_once(
        &self,
        url: &str,
        params: &Params,
        options: &RequestOptions,
    ) -> Result<Value, BiliApiError> {
        let query = encode_query(params);
        let url = if query.is_empty() {
            url.to_string()
        } else {
            format!("{url}?{query}")
        };
        log::trace!("{}Request: {url}", self.tag());
        let response = self
            .client
            .get(&url)
            .headers(self.headers.clone())
            .headers(options.headers.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        log::trace!("{}Response: {text}", self.tag());

        let json_res: Value = match serde_json::from_str(&text) {
            Ok(json_res) => json_res,
            Err(e) => {
                log::debug!(
                    "{}Response text: {}",
                    self.tag(),
                    text.chars().take(200).collect::<String>()
                );
                if status == StatusCode::PRECONDITION_FAILED {
                    return Err(BiliApiError::SecurityControl);
                }
                if !status.is_success() {
                    return Err(BiliApiError::InvalidResponseStatus { status });
                }
                return Err(e.into());
            }
        };
        if options.check_response {
            check_response(&json_res)?;
        }
        Ok(json_res)
    }

    /// GET one url, retrying transient failures until the retry deadline.
    pub async fn get_json_res(
        &self,
        url: &str,
        params: &Params,
        options: &RequestOptions,
    ) -> Result<Value, BiliApiError> {
        let start = Instant::now();
        let mut attempt = 0;
        loop {
            match self.get_json_once(url, params, options).await {
                Ok(json_res) => return Ok(json_res),
                Err(e) if e.is_retryable() && start.elapsed() < self.retry.deadline() => {
                    let wait = self.retry.wait_for_attempt(attempt);
                    log::debug!(
                        "{}Attempt {} on {url} failed: {e}, retry in {wait:?}",
                        self.tag(),
                        attempt + 1
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Try each host in turn; the first success wins, otherwise the last error.
    pub async fn get_json(
        &self,
        base_urls: &[String],
        path: &str,
        params: &Params,
        options: &RequestOptions,
    ) -> Result<Value, BiliApiError> {
        let mut last_error = None;
        for base_url in base_urls {
            let url = format!("{base_url}{path}");
            match self.get_json_res(&url, params, options).await {
                Ok(json_res) => return Ok(json_res),
                Err(e) => {
                    log::trace!("{}Failed to get json from {url}: {e}", self.tag());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(BiliApiError::NoBaseUrls))
    }

    /// Query every host at once and keep every success, in host order.
    ///
    /// Fails only when no host succeeds, with the first collected error.
    pub async fn get_jsons_concurrently(
        &self,
        base_urls: &[String],
        path: &str,
        params: &Params,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, BiliApiError> {
        if base_urls.is_empty() {
            return Err(BiliApiError::NoBaseUrls);
        }
        let urls = base_urls
            .iter()
            .map(|base_url| format!("{base_url}{path}"))
            .collect::<Vec<String>>();
        let results = join_all(
            urls.iter()
                .map(|url| self.get_json_res(url, params, options)),
        )
        .await;

        let mut first_error = None;
        let mut json_responses = Vec::new();
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(json_res) => json_responses.push(json_res),
                Err(e) => {
                    log::trace!("{}Failed to get json from {url}: {e}", self.tag());
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) if json_responses.is_empty() => Err(e),
            _ => Ok(json_responses),
        }
    }
}
