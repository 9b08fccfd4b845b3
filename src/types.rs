use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Available,
    Reserved,
    Paid,
}

impl TicketStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            TicketStatus::Available => "Disponible",
            TicketStatus::Reserved => "Apartado",
            TicketStatus::Paid => "Pagado",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMode {
    Linear,
    Random,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Ticket {
    pub number: String,
    pub extras: Vec<String>,
    pub status: TicketStatus,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub phone: String,
    #[serde(
        rename = "assignedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn available(number: String, extras: Vec<String>) -> Self {
        Ticket {
            number,
            extras,
            status: TicketStatus::Available,
            client: String::new(),
            phone: String::new(),
            assigned_at: None,
        }
    }

    pub fn is_taken(&self) -> bool {
        self.status != TicketStatus::Available
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Raffle {
    pub title: String,
    pub prizes: String,
    pub cost: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Serialize)]
pub struct RaffleStats {
    pub total: usize,
    pub available: usize,
    pub reserved: usize,
    pub paid: usize,
    pub percent_taken: u32,
}

#[derive(Deserialize, Debug)]
pub struct SaveAck {
    pub status: String,
}

impl SaveAck {
    pub fn is_ok(&self) -> bool {
        self.status == "exito"
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptKind {
    Pending,
    Paid,
}

impl ReceiptKind {
    pub fn file_label(&self) -> &'static str {
        match self {
            ReceiptKind::Pending => "Pending",
            ReceiptKind::Paid => "Paid",
        }
    }
}

/// Descriptor handed to the raster export collaborator.
#[derive(Serialize, Debug, Clone)]
pub struct ReceiptData {
    #[serde(rename = "ticketNumbers")]
    pub numbers: Vec<String>,
    #[serde(rename = "clientName")]
    pub client: String,
    #[serde(rename = "extraNumbers")]
    pub extras: Vec<String>,
    #[serde(rename = "totalAmount")]
    pub total: u64,
    pub kind: ReceiptKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_status_serializes_lowercase() {
        let json = serde_json::to_string(&TicketStatus::Reserved).unwrap();
        assert_eq!(json, "\"reserved\"");
        let back: TicketStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(back, TicketStatus::Paid);
    }

    #[test]
    fn ticket_round_trips_without_optional_fields() {
        let ticket = Ticket::available("07".to_string(), vec!["57".to_string()]);
        let json = serde_json::to_string(&ticket).unwrap();
        assert!(!json.contains("assignedAt"));

        let back: Ticket = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ticket);
    }

    #[test]
    fn legacy_ticket_payload_parses() {
        // Shape written by the original flat-file backend.
        let json = r#"{"number":"01","extras":["34","67"],"status":"reserved","client":"Ana","phone":"5512345678"}"#;
        let ticket: Ticket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.status, TicketStatus::Reserved);
        assert_eq!(ticket.client, "Ana");
        assert!(ticket.assigned_at.is_none());
    }

    #[test]
    fn save_ack_status() {
        let ok: SaveAck = serde_json::from_str(r#"{"status":"exito"}"#).unwrap();
        assert!(ok.is_ok());
        let err: SaveAck = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert!(!err.is_ok());
    }
}
