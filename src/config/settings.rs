use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Scraper {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub max_redirects: usize,
    pub max_batch_urls: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: Server,
    pub scraper: Scraper,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "./config".into());

        let s = Config::builder()
            .set_default("server.address", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("scraper.user_agent", crate::application::scraper::fetcher::DEFAULT_USER_AGENT)?
            .set_default("scraper.request_timeout_secs", 30)?
            .set_default("scraper.max_redirects", 5)?
            .set_default("scraper.max_batch_urls", crate::application::scraper::service::MAX_BATCH_URLS as u64)?
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            // APP__SCRAPER__USER_AGENT style; a single "_" would split field names
            .add_source(Environment::with_prefix("APP").prefix_separator("__").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
