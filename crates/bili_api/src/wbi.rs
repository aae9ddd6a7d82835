//! WBI signature used by part of the web API.
//!
//! The two keys rotate and are published as image urls in the nav response.

use serde_json::Value;

use crate::errors::BiliApiError;
use crate::params::{encode_query, to_params, Params};
use crate::response::WbiImg;

pub const MIXIN_KEY_ENC_TAB: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
    28, 14, 39, 12, 38, 41, 13, 37, 48, 7, 16, 24, 55, 40, 61, 26, 17, 0, 1, 60, 51, 30, 4, 22, 25,
    54, 21, 56, 59, 6, 63, 57, 62, 11, 36, 20, 34, 44, 52,
];

const STRIPPED_CHARS: [char; 5] = ['!', '\'', '(', ')', '*'];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WbiKeys {
    pub img_key: String,
    pub sub_key: String,
}

/// File stem of a key url, e.g. `https://i0.hdslb.com/bfs/wbi/<key>.png`.
pub fn key_from_url(url: &str) -> Option<&str> {
    let file_name = url.rsplit('/').next()?;
    let key = file_name.split('.').next()?;
    (!key.is_empty()).then_some(key)
}

impl WbiKeys {
    pub fn new(img_key: &str, sub_key: &str) -> Self {
        Self {
            img_key: img_key.to_string(),
            sub_key: sub_key.to_string(),
        }
    }

    /// Extract the keys from a whole nav response.
    pub fn from_nav(nav: &Value) -> Result<Self, BiliApiError> {
        let wbi_img: WbiImg = serde_json::from_value(nav["data"]["wbi_img"].clone()).map_err(
            |e| BiliApiError::MalformedResponse {
                reason: format!("nav response without wbi_img: {e}"),
            },
        )?;
        let key = |url: &str| {
            key_from_url(url)
                .map(str::to_string)
                .ok_or_else(|| BiliApiError::MalformedResponse {
                    reason: format!("no wbi key in {url}"),
                })
        };
        Ok(Self {
            img_key: key(&wbi_img.img_url)?,
            sub_key: key(&wbi_img.sub_url)?,
        })
    }

    /// Shuffle `img_key + sub_key` through the table, keeping 32 chars.
    ///
    /// Every table position must exist in the concatenated keys.
    pub fn mixin_key(&self) -> Result<String, BiliApiError> {
        let raw = format!("{}{}", self.img_key, self.sub_key)
            .chars()
            .collect::<Vec<char>>();
        let mixin_key = MIXIN_KEY_ENC_TAB
            .iter()
            .map(|&i| raw.get(i))
            .collect::<Option<String>>()
            .ok_or_else(|| BiliApiError::MalformedResponse {
                reason: format!(
                    "wbi keys too short: {} chars, need {}",
                    raw.len(),
                    MIXIN_KEY_ENC_TAB.len()
                ),
            })?
            .chars()
            .take(32)
            .collect::<String>();
        Ok(mixin_key)
    }
}

/// Sign `parameters` at time `wts`, returning them with `wts` and `w_rid`.
pub fn sign(parameters: Value, keys: &WbiKeys, wts: i64) -> Result<Params, BiliApiError> {
    let mixin_key = keys.mixin_key()?;
    let mut params = to_params(parameters)?;
    params.insert("wts".to_string(), wts.to_string());
    let mut params = params
        .into_iter()
        .map(|(k, v)| (k, v.replace(STRIPPED_CHARS, "")))
        .collect::<Params>();
    let query = encode_query(&params);
    let w_rid = md5::compute(query + mixin_key.as_str());
    params.insert("w_rid".to_string(), format!("{w_rid:x}"));
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys() -> WbiKeys {
        WbiKeys::new(
            "7cd084941338484aae1ad9425b84077c",
            "4932caff0ff746eab6f01bf08b70ac45",
        )
    }

    #[test]
    fn test_mixin_key() {
        assert_eq!(keys().mixin_key().unwrap(), "ea1db124af3c7062474693fa704f4ff8");
    }

    #[test]
    fn test_sign_known_vector() {
        let params = sign(
            json!({"foo": "114", "bar": "514", "zab": 1919810}),
            &keys(),
            1702204169,
        )
        .unwrap();
        assert_eq!(params["wts"], "1702204169");
        assert_eq!(params["w_rid"], "8f6f2b5b3d485fe1886cec6a0be8c5d4");
    }

    #[test]
    fn test_sign_strips_reserved_chars() {
        let params = sign(
            json!({"foo": "one two!", "bar": "(5)*'x'"}),
            &keys(),
            1702204169,
        )
        .unwrap();
        assert_eq!(params["foo"], "one two");
        assert_eq!(params["bar"], "5x");
        assert_eq!(params["w_rid"], "503a61ad1df023e194ff9b5463276f3a");
    }

    #[test]
    fn test_sign_danmu_info_params() {
        let params = sign(json!({"id": 22637261, "type": 0}), &keys(), 1700000000).unwrap();
        assert_eq!(params["w_rid"], "f83c24c9a207cf5543af92757f9327a9");
    }

    #[test]
    fn test_short_keys_rejected() {
        let keys = WbiKeys::new("abc", "def");
        assert!(matches!(
            keys.mixin_key(),
            Err(BiliApiError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_keys_missing_table_positions_rejected() {
        // 48 chars covers 32 table positions but not all 64
        let keys = WbiKeys::new("abcdefghijklmnopqrstuvwx", "ABCDEFGHIJKLMNOPQRSTUVWX");
        assert!(matches!(
            keys.mixin_key(),
            Err(BiliApiError::MalformedResponse { .. })
        ));
        assert!(matches!(
            sign(serde_json::json!({"id": 1}), &keys, 1702204169),
            Err(BiliApiError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_from_nav() {
        let nav = json!({
            "code": -101,
            "message": "账号未登录",
            "data": {
                "isLogin": false,
                "wbi_img": {
                    "img_url": "https://i0.hdslb.com/bfs/wbi/7cd084941338484aae1ad9425b84077c.png",
                    "sub_url": "https://i0.hdslb.com/bfs/wbi/4932caff0ff746eab6f01bf08b70ac45.png"
                }
            }
        });
        assert_eq!(WbiKeys::from_nav(&nav).unwrap(), keys());
        assert!(WbiKeys::from_nav(&json!({"code": 0, "data": {}})).is_err());
    }

    #[test]
    fn test_key_from_url() {
        assert_eq!(key_from_url("https://host/bfs/wbi/abc.png"), Some("abc"));
        assert_eq!(key_from_url("abc"), Some("abc"));
        assert_eq!(key_from_url("https://host/bfs/wbi/"), None);
    }
}
