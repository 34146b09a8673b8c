use crate::client::config::Config;
use crate::client::consts::AUTHORIZATION_HEADER;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;

pub fn build_url(config: &Config, path: &str) -> String {
    format!("{}/{}", config.base_url(), path.trim_start_matches('/'))
}

pub fn build_headers(config: &Config) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let key = config.api_key().expose_secret();
    if !key.is_empty() {
        let mut value = HeaderValue::from_str(&format!("Bearer {key}"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION_HEADER, value);
    }
    Ok(headers)
}
