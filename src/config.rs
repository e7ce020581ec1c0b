use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Process-wide configuration, resolved once from defaults and `MICROBLOG_*` env vars.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().unwrap_or_else(|e| panic!("FATAL: invalid configuration: {e}"))
});

pub const COOKIE_NAME: &str = "remember_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    /// Master key material for the private cookie jar. Empty means a random key per process.
    pub cookie_secret: String,
    pub insecure_cookie: bool,
    pub per_page: u32,
    pub admin_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:microblog.sqlite".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            cookie_secret: String::new(),
            insecure_cookie: false,
            per_page: 30,
            admin_email: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("MICROBLOG_"))
            .extract()
    }
}
