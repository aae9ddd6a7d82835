//! Client for the Bilibili Live app and web HTTP APIs.
//!
//! [`AppApi`] mimics the Android client and signs every query with the
//! public app key. [`WebApi`] talks to the browser endpoints, some of which
//! need a WBI signature derived from keys served by the nav endpoint.

pub mod app;
pub mod config;
pub mod errors;
pub mod params;
pub mod request;
pub mod response;
pub mod wbi;
pub mod web;

pub use app::AppApi;
pub use config::{ApiConfig, RetryConfig};
pub use errors::BiliApiError;
pub use params::Params;
pub use response::{DanmuInfo, Qn, ResponseData, RoomInit};
pub use wbi::WbiKeys;
pub use web::WebApi;
