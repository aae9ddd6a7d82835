//! The API used by the Android client.
//!
//! Queries are signed with a fixed `appkey`/`appsec` pair, see
//! https://github.com/SocialSisterYi/bilibili-API-collect/blob/master/other/API_sign.md

use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::errors::BiliApiError;
use crate::params::{encode_query, to_params, unix_timestamp, Params};
use crate::request::{header_map, BaseApi, RequestOptions};
use crate::response::{into_data, Qn, ResponseData};

pub const APPKEY: &str = "1d8b6e7d45233436";
pub const APPSEC: &str = "560c52ccd288fed045859ed18bffd973";

const BUILD: &str = "6640400";

pub const APP_HEADERS: [(&str, &str); 2] = [
    (
        "User-Agent",
        "Mozilla/5.0 BiliDroid/6.64.0 (bbcallen@gmail.com) os/android model/Unknown mobi_app/android build/6640400 channel/bili innerVer/6640400 osVer/6.0.1 network/2",
    ),
    ("Connection", "Keep-Alive"),
];

/// Add `appkey` and the `sign` computed over the sorted query.
pub fn sign(parameters: Value) -> Result<Params, BiliApiError> {
    let mut params = to_params(parameters)?;
    params.insert("appkey".to_string(), APPKEY.to_string());
    let query = encode_query(&params);
    let sign = md5::compute(query + APPSEC);
    params.insert("sign".to_string(), format!("{sign:x}"));
    Ok(params)
}

#[derive(Clone, Debug)]
pub struct AppApi {
    base: BaseApi,
    config: ApiConfig,
}

impl AppApi {
    /// Configured headers are sent too, but the client headers always win.
    pub fn new(client: Client, config: ApiConfig) -> Result<Self, BiliApiError> {
        let mut headers = header_map(
            config
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )?;
        headers.extend(header_map(APP_HEADERS)?);
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

    pub async fn get_room_play_infos(
        &self,
        room_id: u64,
        qn: Qn,
        only_video: bool,
        only_audio: bool,
    ) -> Result<Vec<ResponseData>, BiliApiError> {
        let path = "/xlive/app-room/v2/index/getRoomPlayInfo";
        let params = sign(json!({
            "actionKey": "appkey",
            "build": BUILD,
            "channel": "bili",
            // 0: avc, 1: hevc
            "codec": "0,1",
            "device": "android",
            "device_name": "Unknown",
            "disable_rcmd": "0",
            "dolby": "1",
            // 0: flv, 1: ts, 2: fmp4
            "format": "0,1,2",
            "free_type": "0",
            "http": "1",
            "mask": "0",
            "mobi_app": "android",
            "need_hdr": "0",
            "no_playurl": "0",
            "only_audio": if only_audio { "1" } else { "0" },
            "only_video": if only_video { "1" } else { "0" },
            "platform": "android",
            "play_type": "0",
            "protocol": "0,1",
            "qn": qn.as_u32(),
            "room_id": room_id,
            "ts": unix_timestamp(),
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
        let path = "/xlive/app-room/v1/index/getInfoByRoom";
        let params = sign(room_params(room_id))?;
        self.get_live(path, &params).await
    }

    pub async fn get_user_info(&self, uid: u64) -> Result<ResponseData, BiliApiError> {
        let path = "/x/v2/space";
        let params = sign(json!({
            "build": BUILD,
            "channel": "bili",
            "mobi_app": "android",
            "platform": "android",
            "ts": unix_timestamp(),
            "vmid": uid,
        }))?;
        let json_res = self
            .base
            .get_json(
                &self.config.base_app_urls,
                path,
                &params,
                &RequestOptions::default(),
            )
            .await?;
        Ok(into_data(json_res))
    }

    pub async fn get_danmu_info(&self, room_id: u64) -> Result<ResponseData, BiliApiError> {
        let path = "/xlive/app-room/v1/index/getDanmuInfo";
        let params = sign(room_params(room_id))?;
        self.get_live(path, &params).await
    }

    async fn get_live(&self, path: &str, params: &Params) -> Result<ResponseData, BiliApiError> {
        let json_res = self
            .base
            .get_json(
                &self.config.base_live_api_urls,
                path,
                params,
                &RequestOptions::default(),
            )
            .await?;
        Ok(into_data(json_res))
    }
}

fn room_params(room_id: u64) -> Value {
    json!({
        "actionKey": "appkey",
        "build": BUILD,
        "channel": "bili",
        "device": "android",
        "mobi_app": "android",
        "platform": "android",
        "room_id": room_id,
        "ts": unix_timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_known_vector() {
        let params = sign(json!({
            "room_id": 22637261,
            "ts": 1700000000,
            "build": "6640400",
            "codec": "0,1",
        }))
        .unwrap();
        assert_eq!(params["appkey"], APPKEY);
        assert_eq!(params["sign"], "b232e7a9c87d333fedf39b9b635ef7de");
    }

    #[test]
    fn test_sign_non_ascii_values() {
        let params = sign(json!({
            "id": 114514,
            "str": "1",
            "test": "いいよ，こいよ",
        }))
        .unwrap();
        assert_eq!(params["sign"], "fb360931a683197e0d96d5af42edfba3");
    }

    #[test]
    fn test_sign_is_deterministic() {
        let parameters = json!({"vmid": 2, "ts": 1700000000, "platform": "android"});
        let first = sign(parameters.clone()).unwrap();
        let second = sign(parameters).unwrap();
        assert_eq!(first, second);
        // the signature is computed over everything but itself
        let mut unsigned = first.clone();
        unsigned.remove("sign");
        let digest = md5::compute(encode_query(&unsigned) + APPSEC);
        assert_eq!(first["sign"], format!("{digest:x}"));
    }

    #[test]
    fn test_app_headers_override_configured() {
        let mut config = ApiConfig::default();
        config
            .headers
            .insert("User-Agent".to_string(), "browser".to_string());
        config
            .headers
            .insert("Cookie".to_string(), "SESSDATA=1".to_string());
        let api = AppApi::new(Client::new(), config).unwrap();
        let headers = api.base().headers();
        assert!(headers["user-agent"].to_str().unwrap().contains("BiliDroid"));
        assert_eq!(headers["cookie"], "SESSDATA=1");
        assert!(!headers.contains_key("origin"));
        // left to reqwest, which only decompresses what it negotiated
        assert!(!headers.contains_key("accept-encoding"));
    }
}
