use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::BiliApiError;

/// The `data` member of a response envelope.
pub type ResponseData = Value;

/// Check the `{code, message, data}` envelope.
pub fn check_response(json_res: &Value) -> Result<(), BiliApiError> {
    let code = json_res["code"]
        .as_i64()
        .ok_or_else(|| BiliApiError::MalformedResponse {
            reason: format!("missing code in {json_res}"),
        })?;
    if code != 0 {
        let message = [&json_res["message"], &json_res["msg"]]
            .into_iter()
            .filter_map(Value::as_str)
            .find(|m| !m.is_empty())
            .unwrap_or("")
            .to_string();
        return Err(BiliApiError::ApiRequest { code, message });
    }
    Ok(())
}

/// Move `data` out of a checked envelope.
pub fn into_data(mut json_res: Value) -> ResponseData {
    json_res["data"].take()
}

// 30000	杜比
// 20000	4K
// 15000	2K
// 10000	原画
// 401	蓝光(杜比)
// 400	蓝光
// 250	超清
// 150	高清
// 80	流畅
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Qn {
    Dolby = 30000,
    Q4K = 20000,
    Q2K = 15000,
    #[default]
    Original = 10000,
    BluRayDolby = 401,
    BluRay = 400,
    SuperHd = 250,
    Hd = 150,
    Smooth = 80,
}

impl Qn {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Qn {
    type Error = BiliApiError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            30000 => Ok(Qn::Dolby),
            20000 => Ok(Qn::Q4K),
            15000 => Ok(Qn::Q2K),
            10000 => Ok(Qn::Original),
            401 => Ok(Qn::BluRayDolby),
            400 => Ok(Qn::BluRay),
            250 => Ok(Qn::SuperHd),
            150 => Ok(Qn::Hd),
            80 => Ok(Qn::Smooth),
            _ => Err(BiliApiError::InvalidParams {
                reason: format!("unknown qn {value}"),
            }),
        }
    }
}

impl fmt::Display for Qn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoomInit {
    pub room_id: u64,
    pub short_id: u64,
    pub uid: u64,
    pub live_status: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DanmuHost {
    pub host: String,
    pub port: u16,
    pub wss_port: u16,
    pub ws_port: u16,
}

/// Danmu server credentials, shared by the app and web endpoints.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DanmuInfo {
    pub token: String,
    pub host_list: Vec<DanmuHost>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WbiImg {
    pub img_url: String,
    pub sub_url: String,
}

impl DanmuInfo {
    pub fn from_data(data: ResponseData) -> Result<Self, BiliApiError> {
        Ok(serde_json::from_value(data)?)
    }
}

impl RoomInit {
    pub fn from_data(data: ResponseData) -> Result<Self, BiliApiError> {
        Ok(serde_json::from_value(data)?)
    }
}
