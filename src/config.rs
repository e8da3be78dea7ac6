use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        openai_api_key: env::var("OPENAI_API_KEY").ok(),
        openai_model: get_env_or_default("OPENAI_MODEL", "gpt-4o-mini"),
        stac_url: get_env_or_default("STAC_URL", "https://earth-search.aws.element84.com/v1"),
        save_dir: get_env_or_default("SAVE_DIR", "./downloads"),
        days_margin: get_env_parsed("DAYS_MARGIN", 10),
        deg_margin: get_env_parsed("DEG_MARGIN", 0.2),
    }
});

pub struct Config {
    /// Only the chat agent needs this; `fetch` works without a key.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub stac_url: String,
    pub save_dir: String,
    pub days_margin: u32,
    pub deg_margin: f64,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
