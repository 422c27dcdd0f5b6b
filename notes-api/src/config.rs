use std::sync::OnceLock;

use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,

    // auth
    /// Header carrying the caller's user id, set by the upstream authenticator.
    #[serde(default = "default_user_header")]
    pub user_header: String,

    // storage
    #[serde(default = "default_storage_url_prefix")]
    pub storage_url_prefix: String,
    #[serde(default = "default_upload_ttl_secs")]
    pub upload_ttl_secs: i64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    // logging
    #[serde(default)]
    pub log_json: bool,

    // build
    pub app_version: Option<String>,
    #[serde(default = "default_local")]
    pub source: String,
    #[serde(default = "default_local")]
    pub git_commit: String,
    #[serde(default = "default_local")]
    pub pipeline_id: String,
    #[serde(default = "default_local")]
    pub version: String,
}

fn default_port() -> u16 {
    4000
}

fn default_database_url() -> String {
    "sqlite.db".into()
}

fn default_user_header() -> String {
    "x-user-id".into()
}

fn default_storage_url_prefix() -> String {
    "/api/v1/storage".into()
}

fn default_upload_ttl_secs() -> i64 {
    60 * 60
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_local() -> String {
    "local".into()
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        match envy::from_env::<Self>() {
            Ok(config) => config,
            Err(err) => panic!("invalid configuration: {err}"),
        }
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

#[cfg(test)]
pub fn config_override<F>(override_config: F) -> &'static Config
where
    F: FnOnce(Config) -> Config,
{
    CONFIG.get_or_init(|| override_config(Config::from_env()))
}
