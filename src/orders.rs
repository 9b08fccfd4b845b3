use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::types::{Raffle, ReceiptData, ReceiptKind, TicketStatus};
use crate::utils::{digits_only, normalize_client_key};

/// One participant's tickets in a raffle, grouped by (client, phone).
/// Derived on demand, never persisted. The total is gross value, paid
/// tickets included.
#[derive(Debug, Clone, Serialize)]
pub struct OrderGroup {
    pub client: String,
    pub phone: String,
    pub numbers: Vec<String>,
    pub extras: Vec<String>,
    pub count: usize,
    pub total: u64,
    pub status: TicketStatus,
    #[serde(rename = "lastActivity", skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl OrderGroup {
    pub fn receipt(&self) -> ReceiptData {
        ReceiptData {
            numbers: self.numbers.clone(),
            client: self.client.clone(),
            extras: self.extras.clone(),
            total: self.total,
            kind: match self.status {
                TicketStatus::Reserved => ReceiptKind::Pending,
                _ => ReceiptKind::Paid,
            },
        }
    }
}

/// Groups every non-available ticket by normalized client+phone. Groups
/// with any reserved ticket come first, then most recent activity.
pub fn group_orders(raffle: &Raffle, pending_only: bool) -> Vec<OrderGroup> {
    let mut groups: HashMap<(String, String), OrderGroup> = HashMap::new();

    for ticket in &raffle.tickets {
        if ticket.status == TicketStatus::Available {
            continue;
        }
        let key = (
            normalize_client_key(&ticket.client),
            digits_only(&ticket.phone),
        );

        let group = groups.entry(key).or_insert_with(|| OrderGroup {
            client: ticket.client.clone(),
            phone: ticket.phone.clone(),
            numbers: Vec::new(),
            extras: Vec::new(),
            count: 0,
            total: 0,
            status: TicketStatus::Paid,
            last_activity: None,
        });

        group.numbers.push(ticket.number.clone());
        group.extras.extend(ticket.extras.iter().cloned());
        group.count += 1;
        group.total += raffle.cost as u64;
        if ticket.status == TicketStatus::Reserved {
            group.status = TicketStatus::Reserved;
        }
        if ticket.assigned_at > group.last_activity {
            group.last_activity = ticket.assigned_at;
        }
    }

    let mut orders: Vec<OrderGroup> = groups.into_values().collect();
    if pending_only {
        orders.retain(|g| g.status == TicketStatus::Reserved);
    }

    orders.sort_by(|a, b| {
        let a_pending = a.status == TicketStatus::Reserved;
        let b_pending = b.status == TicketStatus::Reserved;
        b_pending
            .cmp(&a_pending)
            .then(b.last_activity.cmp(&a.last_activity))
    });
    orders
}

/// Normalized name+phone lookup, used to rebuild a receipt for reprinting.
pub fn lookup(raffle: &Raffle, client: &str, phone: &str) -> Option<OrderGroup> {
    let name_key = normalize_client_key(client);
    let phone_key = digits_only(phone);

    group_orders(raffle, false).into_iter().find(|g| {
        normalize_client_key(&g.client) == name_key && digits_only(&g.phone) == phone_key
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RaffleStore;
    use crate::types::AllocationMode;

    fn raffle_with_orders() -> Raffle {
        let mut store = RaffleStore::default();
        store
            .create(
                "Rifa",
                "Premio",
                20,
                33,
                AllocationMode::Linear,
                None,
            )
            .unwrap();
        store.reserve(0, &[0, 4], "Ana", "5512345678").unwrap();
        store.reserve(0, &[7], "Beto", "5587654321").unwrap();
        store.mark_paid(0, &[7], None, false).unwrap();
        store.get(0).unwrap().clone()
    }

    #[test]
    fn groups_by_client_and_phone() {
        let raffle = raffle_with_orders();
        let orders = group_orders(&raffle, false);
        assert_eq!(orders.len(), 2);

        let ana = orders.iter().find(|g| g.client == "Ana").unwrap();
        assert_eq!(ana.numbers, vec!["01", "05"]);
        assert_eq!(ana.count, 2);
        assert_eq!(ana.total, 40);
        assert_eq!(ana.status, TicketStatus::Reserved);

        let beto = orders.iter().find(|g| g.client == "Beto").unwrap();
        assert_eq!(beto.status, TicketStatus::Paid);
        assert_eq!(beto.total, 20);
    }

    #[test]
    fn pending_groups_sort_first() {
        let raffle = raffle_with_orders();
        let orders = group_orders(&raffle, false);
        assert_eq!(orders[0].client, "Ana");
        assert_eq!(orders[1].client, "Beto");
    }

    #[test]
    fn pending_only_filter() {
        let raffle = raffle_with_orders();
        let pending = group_orders(&raffle, true);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].client, "Ana");
    }

    #[test]
    fn same_client_differing_case_is_one_group() {
        let mut store = RaffleStore::default();
        store
            .create("Rifa", "Premio", 10, 33, AllocationMode::Linear, None)
            .unwrap();
        store.reserve(0, &[0], "Ana Luisa", "111").unwrap();
        store.reserve(0, &[1], "ANA  LUISA", "111").unwrap();

        let orders = group_orders(store.get(0).unwrap(), false);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].count, 2);
    }

    #[test]
    fn lookup_rebuilds_receipt_for_reprint() {
        let raffle = raffle_with_orders();

        let group = lookup(&raffle, " ana ", "55 1234 5678").unwrap();
        let receipt = group.receipt();
        assert_eq!(receipt.numbers, vec!["01", "05"]);
        assert_eq!(receipt.total, 40);
        assert_eq!(receipt.kind, ReceiptKind::Pending);

        let paid = lookup(&raffle, "Beto", "5587654321").unwrap().receipt();
        assert_eq!(paid.kind, ReceiptKind::Paid);

        assert!(lookup(&raffle, "Carlos", "000").is_none());
    }

    #[test]
    fn gross_total_includes_paid_tickets() {
        let mut store = RaffleStore::default();
        store
            .create("Rifa", "Premio", 15, 33, AllocationMode::Linear, None)
            .unwrap();
        store.reserve(0, &[0, 1, 2], "Ana", "111").unwrap();
        store.mark_paid(0, &[0], None, false).unwrap();

        let orders = group_orders(store.get(0).unwrap(), false);
        assert_eq!(orders.len(), 1);
        // Debt framing: paid tickets still count toward the group total.
        assert_eq!(orders[0].total, 45);
        assert_eq!(orders[0].status, TicketStatus::Reserved);
    }
}
