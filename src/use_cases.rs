use anyhow::Result;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::BackendClient;
use crate::messaging;
use crate::orders;
use crate::reports;
use crate::store::{PaidOutcome, RaffleStore};
use crate::types::{AllocationMode, Raffle, ReceiptData};

fn require_str<'a>(arguments: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing {} parameter", key))
}

fn require_u64(arguments: &HashMap<String, Value>, key: &str) -> Result<u64> {
    arguments
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| anyhow::anyhow!("Missing {} parameter", key))
}

fn require_indices(arguments: &HashMap<String, Value>, key: &str) -> Result<Vec<usize>> {
    let value = arguments
        .get(key)
        .ok_or_else(|| anyhow::anyhow!("Missing {} parameter", key))?;
    let indices: Vec<usize> = serde_json::from_value(value.clone())?;
    Ok(indices)
}

fn opt_flag(arguments: &HashMap<String, Value>, key: &str) -> bool {
    arguments
        .get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Raffle lifecycle and ticket status transitions. Every mutation is
/// followed by a write-through save of the whole collection; a failed
/// save is logged, never surfaced.
pub struct RaffleUseCase {
    store: Arc<Mutex<RaffleStore>>,
    backend: Arc<BackendClient>,
    receipt_path: String,
}

impl RaffleUseCase {
    pub fn new(
        store: Arc<Mutex<RaffleStore>>,
        backend: Arc<BackendClient>,
        receipt_path: String,
    ) -> Self {
        Self {
            store,
            backend,
            receipt_path,
        }
    }

    fn snapshot(&self) -> Vec<Raffle> {
        self.store.lock().raffles().to_vec()
    }

    fn emit_receipt(&self, raffle: &Raffle, receipt: &ReceiptData) -> Result<Value> {
        let image = reports::generate_and_save_receipt(raffle, receipt, &self.receipt_path)?;
        Ok(json!({ "receipt": receipt, "image_filename": image }))
    }

    pub async fn create_raffle(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let title = require_str(arguments, "title")?;
        let prizes = arguments
            .get("prizes")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let cost = require_u64(arguments, "cost")? as u32;
        let quantity = require_u64(arguments, "quantity")? as u32;
        let mode: AllocationMode = match arguments.get("mode").and_then(|v| v.as_str()) {
            Some(raw) => serde_json::from_value(json!(raw))?,
            None => AllocationMode::Linear,
        };
        let theme = arguments
            .get("theme")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let index = {
            let mut store = self.store.lock();
            store.create(title, prizes, cost, quantity, mode, theme)?
        };
        self.backend.save_logged(&self.snapshot()).await;

        Ok(json!({
            "success": true,
            "raffle_index": index,
            "message": format!("Rifa \"{}\" creada con {} boletos", title, quantity)
        })
        .to_string())
    }

    pub async fn list_raffles(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let store = self.store.lock();
        let summaries: Vec<Value> = store
            .raffles()
            .iter()
            .enumerate()
            .map(|(i, raffle)| {
                let taken = raffle.tickets.iter().filter(|t| t.is_taken()).count();
                json!({
                    "index": i,
                    "title": raffle.title,
                    "cost": raffle.cost,
                    "tickets": raffle.tickets.len(),
                    "taken": taken,
                })
            })
            .collect();

        Ok(json!({
            "success": true,
            "active_index": store.active_index(),
            "raffles": summaries
        })
        .to_string())
    }

    pub async fn select_raffle(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let mut store = self.store.lock();
        let raffle = store.select(index)?;

        Ok(json!({ "success": true, "raffle": raffle }).to_string())
    }

    pub async fn get_raffle(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let store = self.store.lock();
        let raffle = store.get(index)?;

        Ok(json!({ "success": true, "raffle": raffle }).to_string())
    }

    pub async fn edit_raffle(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let title = require_str(arguments, "title")?;
        let prizes = arguments
            .get("prizes")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let cost = require_u64(arguments, "cost")? as u32;
        let theme = arguments
            .get("theme")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        {
            let mut store = self.store.lock();
            store.edit(index, title, prizes, cost, theme)?;
        }
        self.backend.save_logged(&self.snapshot()).await;

        Ok(json!({ "success": true, "message": "Rifa actualizada" }).to_string())
    }

    pub async fn delete_raffle(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let removed = {
            let mut store = self.store.lock();
            store.delete(index)?
        };
        self.backend.save_logged(&self.snapshot()).await;

        Ok(json!({
            "success": true,
            "message": format!("Rifa \"{}\" eliminada", removed.title)
        })
        .to_string())
    }

    pub async fn get_raffle_stats(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let store = self.store.lock();
        let stats = store.stats(index)?;

        Ok(json!({ "success": true, "stats": stats }).to_string())
    }

    /// Pre-flight cascade scan shared by the bulk mutations: unless the
    /// caller opts out, tickets of the same client outside the selection
    /// block the operation and are returned as candidates.
    fn related_guard(
        &self,
        index: usize,
        ticket_indices: &[usize],
        arguments: &HashMap<String, Value>,
    ) -> Result<Option<String>> {
        if opt_flag(arguments, "skip_related_check") {
            return Ok(None);
        }
        let store = self.store.lock();
        let related = store.find_related(index, ticket_indices)?;
        if related.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            json!({
                "success": false,
                "related_tickets": related,
                "message": "El cliente tiene otros boletos; inclúyelos o repite con skip_related_check"
            })
            .to_string(),
        ))
    }

    pub async fn reserve_tickets(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let tickets = require_indices(arguments, "tickets")?;
        let client = require_str(arguments, "client")?;
        let phone = arguments
            .get("phone")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let (receipt, raffle) = {
            let mut store = self.store.lock();
            let receipt = store.reserve(index, &tickets, client, phone)?;
            (receipt, store.get(index)?.clone())
        };
        self.backend.save_logged(&self.snapshot()).await;

        let emitted = self.emit_receipt(&raffle, &receipt)?;
        Ok(json!({
            "success": true,
            "total": receipt.total,
            "receipt": emitted
        })
        .to_string())
    }

    pub async fn mark_tickets_paid(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let tickets = require_indices(arguments, "tickets")?;
        let fallback = arguments.get("client").and_then(|v| v.as_str());
        let confirm_mixed = opt_flag(arguments, "confirm_mixed");

        if let Some(blocked) = self.related_guard(index, &tickets, arguments)? {
            return Ok(blocked);
        }

        let outcome = {
            let mut store = self.store.lock();
            store.mark_paid(index, &tickets, fallback, confirm_mixed)?
        };

        match outcome {
            PaidOutcome::MixedClients(clients) => Ok(json!({
                "success": false,
                "clients": clients,
                "message": "Los boletos son de clientes distintos; repite con confirm_mixed"
            })
            .to_string()),
            PaidOutcome::Done(receipt) => {
                let raffle = { self.store.lock().get(index)?.clone() };
                self.backend.save_logged(&self.snapshot()).await;

                let emitted = self.emit_receipt(&raffle, &receipt)?;
                Ok(json!({
                    "success": true,
                    "total": receipt.total,
                    "receipt": emitted
                })
                .to_string())
            }
        }
    }

    pub async fn release_tickets(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let tickets = require_indices(arguments, "tickets")?;

        if let Some(blocked) = self.related_guard(index, &tickets, arguments)? {
            return Ok(blocked);
        }

        {
            let mut store = self.store.lock();
            store.release(index, &tickets)?;
        }
        self.backend.save_logged(&self.snapshot()).await;

        Ok(json!({ "success": true, "message": "Boletos liberados" }).to_string())
    }

    pub async fn bulk_update_status(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let tickets = require_indices(arguments, "tickets")?;
        let status = serde_json::from_value(json!(require_str(arguments, "status")?))?;

        {
            let mut store = self.store.lock();
            store.bulk_update_status(index, &tickets, status)?;
        }
        self.backend.save_logged(&self.snapshot()).await;

        Ok(json!({ "success": true, "message": "Estado actualizado" }).to_string())
    }

    pub async fn find_related_tickets(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let tickets = require_indices(arguments, "tickets")?;

        let store = self.store.lock();
        let related = store.find_related(index, &tickets)?;

        Ok(json!({ "success": true, "related_tickets": related }).to_string())
    }
}

/// Participant/order read model plus receipt reprinting.
pub struct OrderUseCase {
    store: Arc<Mutex<RaffleStore>>,
    receipt_path: String,
}

impl OrderUseCase {
    pub fn new(store: Arc<Mutex<RaffleStore>>, receipt_path: String) -> Self {
        Self {
            store,
            receipt_path,
        }
    }

    pub async fn list_orders(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let pending_only = opt_flag(arguments, "pending_only");

        let store = self.store.lock();
        let raffle = store.get(index)?;
        let groups = orders::group_orders(raffle, pending_only);

        Ok(json!({ "success": true, "orders": groups }).to_string())
    }

    pub async fn export_raffle_grid(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;

        let raffle = { self.store.lock().get(index)?.clone() };
        let image = reports::generate_and_save_grid(&raffle, &self.receipt_path)?;

        Ok(json!({ "success": true, "image_filename": image }).to_string())
    }

    pub async fn reprint_receipt(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let client = require_str(arguments, "client")?;
        let phone = arguments
            .get("phone")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let raffle = { self.store.lock().get(index)?.clone() };
        let group = match orders::lookup(&raffle, client, phone) {
            Some(group) => group,
            None => anyhow::bail!("no hay boletos registrados a nombre de {}", client),
        };

        let receipt = group.receipt();
        let image = reports::generate_and_save_receipt(&raffle, &receipt, &self.receipt_path)?;

        Ok(json!({
            "success": true,
            "receipt": receipt,
            "image_filename": image
        })
        .to_string())
    }
}

/// Composes the WhatsApp texts and deep links for a participant.
pub struct MessagingUseCase {
    store: Arc<Mutex<RaffleStore>>,
    country_code: String,
}

impl MessagingUseCase {
    pub fn new(store: Arc<Mutex<RaffleStore>>, country_code: String) -> Self {
        Self {
            store,
            country_code,
        }
    }

    pub async fn compose_whatsapp_message(
        &self,
        arguments: &HashMap<String, Value>,
    ) -> Result<String> {
        let index = require_u64(arguments, "raffle_index")? as usize;
        let client = require_str(arguments, "client")?;
        let phone = arguments
            .get("phone")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let intent: messaging::MessageIntent =
            serde_json::from_value(json!(require_str(arguments, "intent")?))?;

        let raffle = { self.store.lock().get(index)?.clone() };
        let group = match orders::lookup(&raffle, client, phone) {
            Some(group) => group,
            None => anyhow::bail!("no hay boletos registrados a nombre de {}", client),
        };

        let text = messaging::compose_message(
            intent,
            &group.client,
            &raffle.title,
            &group.numbers,
            group.total,
        );
        let link = messaging::wa_link(&group.phone, &self.country_code, &text)?;

        Ok(json!({ "success": true, "message": text, "link": link }).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_helpers() {
        let mut args: HashMap<String, Value> = HashMap::new();
        args.insert("title".to_string(), json!("Rifa"));
        args.insert("cost".to_string(), json!(20));
        args.insert("tickets".to_string(), json!([0, 1]));

        assert_eq!(require_str(&args, "title").unwrap(), "Rifa");
        assert_eq!(require_u64(&args, "cost").unwrap(), 20);
        assert_eq!(require_indices(&args, "tickets").unwrap(), vec![0, 1]);
        assert!(require_str(&args, "missing").is_err());
        assert!(!opt_flag(&args, "confirm_mixed"));
    }
}
