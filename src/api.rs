use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::types::{Raffle, SaveAck};

/// Client for the flat-file persistence backend: GET returns the whole
/// collection, POST overwrites it. Single writer, last write wins; there
/// is no conflict detection and the in-memory state stays authoritative
/// for the session.
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        BackendClient {
            base_url: base_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn load(&self) -> Result<Vec<Raffle>> {
        let response = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .context("no se pudo consultar el backend")?;

        let data: Value = response
            .json()
            .await
            .context("respuesta del backend no es JSON")?;

        let raffles = normalize_state(data)?;
        info!("cargadas {} rifas del backend", raffles.len());
        Ok(raffles)
    }

    pub async fn save(&self, raffles: &[Raffle]) -> Result<SaveAck> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json")
            .json(&raffles)
            .send()
            .await?;

        let ack: SaveAck = response.json().await?;
        Ok(ack)
    }

    /// Write-through save. Failures are logged and swallowed: the user
    /// keeps working against the in-memory state.
    pub async fn save_logged(&self, raffles: &[Raffle]) {
        match self.save(raffles).await {
            Ok(ack) if ack.is_ok() => {}
            Ok(ack) => warn!("el backend rechazó el guardado: {}", ack.status),
            Err(e) => warn!("error guardando en el backend: {}", e),
        }
    }
}

/// Decodes the persisted state, accepting the legacy shapes the flat file
/// accumulated over time: null/empty for a fresh install, and the old
/// single-raffle object (anything with a `tickets` key) wrapped into a
/// one-element array.
pub fn normalize_state(data: Value) -> Result<Vec<Raffle>> {
    let normalized = match data {
        Value::Null => Value::Array(Vec::new()),
        Value::Object(map) if map.contains_key("tickets") => {
            Value::Array(vec![Value::Object(map)])
        }
        other => other,
    };

    serde_json::from_value(normalized).context("estado de rifas ilegible")
}
