pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use time::UtcOffset;

use crate::infra::{db::Db, push::PushClient};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub push: PushClient,
    pub paseto_access_key: [u8; 32],
    pub paseto_refresh_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub refresh_ttl_days: u64,
    pub mess_tz: UtcOffset,
}
