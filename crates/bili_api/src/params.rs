use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::BiliApiError;

/// Query parameters, kept sorted by key.
pub type Params = BTreeMap<String, String>;

/// Flatten a JSON object built with `json!` into query parameters.
///
/// Strings are taken as is, numbers and booleans are stringified and `null`
/// becomes an empty value. Nested arrays or objects are rejected.
pub fn to_params(parameters: Value) -> Result<Params, BiliApiError> {
    let Value::Object(map) = parameters else {
        return Err(BiliApiError::InvalidParams {
            reason: format!("expected an object, got {parameters}"),
        });
    };
    map.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                other => {
                    return Err(BiliApiError::InvalidParams {
                        reason: format!("value of {key} is not a scalar: {other}"),
                    })
                }
            };
            Ok((key, value))
        })
        .collect()
}

/// Serialize parameters as `k=v&k=v` in key order.
///
/// Everything except `A-Z a-z 0-9 - _ . ~` is percent-encoded. Both signers
/// hash exactly this string, so requests must be sent with it verbatim.
pub fn encode_query(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<String>>()
        .join("&")
}

/// Current Unix time in seconds.
pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
