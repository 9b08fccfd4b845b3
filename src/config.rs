use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub receipt_path: String,
    pub country_code: String,
}

pub fn load() -> Result<Config> {
    let backend_url = env::var("RIFA_BACKEND_URL")
        .unwrap_or_else(|_| "http://localhost/backend.php".to_string());
    let receipt_path = env::var("RIFA_RECEIPT_PATH").unwrap_or_else(|_| "receipts".to_string());
    let country_code = env::var("RIFA_COUNTRY_CODE").unwrap_or_else(|_| "52".to_string());

    Ok(Config {
        backend_url,
        receipt_path,
        country_code,
    })
}
