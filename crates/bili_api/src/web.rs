use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::errors::BiliApiError;
use crate::params::{to_params, unix_timestamp, Params};
use crate::request::{header_map, BaseApi, RequestOptions, BASE_HEADERS};
use crate::response::{into_data, Qn, ResponseData, RoomInit};
use crate::wbi::{self, WbiKeys};

const NAV_PATH: &str = "/x/web-interface/nav";

#[derive(Clone, Debug)]
pub struct WebApi {
    base: BaseApi,
    config: ApiConfig,
}

impl WebApi {
    /// Browser headers, overridden by the configured ones.
    pub fn new(client: Client, config: ApiConfig) -> Result<Self, BiliApiError> {
        let mut headers = header_map(BASE_HEADERS)?;
        headers.extend(header_map(
            config
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )?);
        Ok(Self {
            base: BaseApi::new(client, &config, headers),
            config,
        })
    }

    pub fn bind_room(mut self, room_id: u64) -> Self {
        self.base = self.base.bind_room(room_id);
        self
    }

    pub fn base(&self) -> &BaseApi {
        &self.base
    }

    pub async fn room_init(&self, room_id: u64) -> Result<ResponseData, BiliApiError> {
        let path = "/room/v1/Room/room_init";
        self.get_live(path, to_params(json!({ "id": room_id }))?)
            .await
    }

    /// Resolve a short room id to the real one.
    pub async fn resolve_room_id(&self, room_id: u64) -> Result<u64, BiliApiError> {
        let room_init = RoomInit::from_data(self.room_init(room_id).await?)?;
        Ok(room_init.room_id)
    }

    pub async fn get_room_play_infos(
        &self,
        room_id: u64,
        qn: Qn,
    ) -> Result<Vec<ResponseData>, BiliApiError> {
        let path = "/xlive/web-room/v2/index/getRoomPlayInfo";
        let params = to_params(json!({
            "room_id": room_id,
            "protocol": "0,1",
            "format": "0,1,2",
            "codec": "0,1",
            "qn": qn.as_u32(),
            "platform": "web",
            "ptype": 8,
        }))?;
        let json_responses = self
            .base
            .get_jsons_concurrently(
                &self.config.base_play_info_api_urls,
                path,
                &params,
                &RequestOptions::default(),
            )
            .await?;
        Ok(json_responses.into_iter().map(into_data).collect())
    }

    pub async fn get_info_by_room(&self, room_id: u64) -> Result<ResponseData, BiliApiError> {
        let path = "/xlive/web-room/v1/index/getInfoByRoom";
        self.get_live(path, to_params(json!({ "room_id": room_id }))?)
            .await
    }

    pub async fn get_info(&self, room_id: u64) -> Result<ResponseData, BiliApiError> {
        let path = "/room/v1/Room/get_info";
        self.get_live(path, to_params(json!({ "room_id": room_id }))?)
            .await
    }

    pub async fn get_timestamp(&self) -> Result<i64, BiliApiError> {
        let path = "/av/v1/Time/getTimestamp";
        let data = self
            .get_live(path, to_params(json!({ "platform": "pc" }))?)
            .await?;
        data["timestamp"]
            .as_i64()
            .ok_or_else(|| BiliApiError::MalformedResponse {
                reason: format!("no timestamp in {data}"),
            })
    }

    pub async fn get_user_info(&self, uid: u64, cookie: &str) -> Result<ResponseData, BiliApiError> {
        let path = "/x/space/wbi/acc/info";
        let params = self.wbi_sign(json!({ "mid": uid }), cookie).await?;
        let json_res = self
            .base
            .get_json(
                &self.config.base_api_urls,
                path,
                &params,
                &RequestOptions::default(),
            )
            .await?;
        Ok(into_data(json_res))
    }

    pub async fn get_danmu_info(
        &self,
        room_id: u64,
        cookie: &str,
    ) -> Result<ResponseData, BiliApiError> {
        let path = "/xlive/web-room/v1/index/getDanmuInfo";
        let mut params = self
            .wbi_sign(json!({ "id": room_id, "type": 0 }), cookie)
            .await?;
        // not part of the signature
        params.insert("web_location".to_string(), "444.8".to_string());
        self.get_live(path, params).await
    }

    /// The whole nav response; logged out sessions answer with code -101.
    pub async fn get_nav(&self) -> Result<Value, BiliApiError> {
        let options = RequestOptions {
            check_response: false,
            ..Default::default()
        };
        self.base
            .get_json(&self.config.base_api_urls, NAV_PATH, &Params::new(), &options)
            .await
    }

    /// Fetch the current WBI keys with the given session cookie.
    pub async fn fetch_wbi_keys(&self, cookie: &str) -> Result<WbiKeys, BiliApiError> {
        let options = RequestOptions {
            headers: header_map([("Referer", "https://www.bilibili.com/"), ("Cookie", cookie)])?,
            check_response: false,
        };
        let nav = self
            .base
            .get_json(&self.config.base_api_urls, NAV_PATH, &Params::new(), &options)
            .await?;
        WbiKeys::from_nav(&nav)
    }

    /// Sign with freshly fetched keys at the current time.
    pub async fn wbi_sign(&self, parameters: Value, cookie: &str) -> Result<Params, BiliApiError> {
        let keys = self.fetch_wbi_keys(cookie).await?;
        wbi::sign(parameters, &keys, unix_timestamp())
    }

    async fn get_live(&self, path: &str, params: Params) -> Result<ResponseData, BiliApiError> {
        let json_res = self
            .base
            .get_json(
                &self.config.base_live_api_urls,
                path,
                &params,
                &RequestOptions::default(),
            )
            .await?;
        Ok(into_data(json_res))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_headers_override_browser_headers() {
        let mut config = ApiConfig::default();
        config
            .headers
            .insert("Cookie".to_string(), "SESSDATA=1".to_string());
        config
            .headers
            .insert("Origin".to_string(), "https://www.bilibili.com".to_string());
        let api = WebApi::new(Client::new(), config).unwrap();
        let headers = api.base().headers();
        assert_eq!(headers["cookie"], "SESSDATA=1");
        assert_eq!(headers["origin"], "https://www.bilibili.com");
        assert!(headers["user-agent"].to_str().unwrap().contains("Chrome"));
    }

    #[test]
    fn test_invalid_configured_header() {
        let mut config = ApiConfig::default();
        config
            .headers
            .insert("Cookie".to_string(), "bad\nvalue".to_string());
        assert!(matches!(
            WebApi::new(Client::new(), config),
            Err(BiliApiError::InvalidHeader { .. })
        ));
    }
}
