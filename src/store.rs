use anyhow::{Result, bail};
use chrono::Utc;
use serde::Serialize;

use crate::allocator;
use crate::types::{
    AllocationMode, Raffle, RaffleStats, ReceiptData, ReceiptKind, Ticket, TicketStatus,
};
use crate::utils::{digits_only, normalize_client_key, pad2};

/// Whole application state: every raffle plus the active selection.
/// All mutations go through here so each transition is a plain function
/// of (state, action); persistence is the caller's concern.
#[derive(Debug, Default)]
pub struct RaffleStore {
    raffles: Vec<Raffle>,
    active: Option<usize>,
}

/// A ticket elsewhere in the raffle held by the same client as the
/// current selection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RelatedTicket {
    pub index: usize,
    pub number: String,
    pub client: String,
    pub status: TicketStatus,
}

#[derive(Debug)]
pub enum PaidOutcome {
    Done(ReceiptData),
    /// Selection spans differing client names; nothing was changed.
    MixedClients(Vec<String>),
}

impl RaffleStore {
    pub fn new(raffles: Vec<Raffle>) -> Self {
        RaffleStore {
            raffles,
            active: None,
        }
    }

    pub fn raffles(&self) -> &[Raffle] {
        &self.raffles
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn get(&self, index: usize) -> Result<&Raffle> {
        match self.raffles.get(index) {
            Some(raffle) => Ok(raffle),
            None => bail!("no existe la rifa {}", index),
        }
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Raffle> {
        match self.raffles.get_mut(index) {
            Some(raffle) => Ok(raffle),
            None => bail!("no existe la rifa {}", index),
        }
    }

    pub fn select(&mut self, index: usize) -> Result<&Raffle> {
        if index >= self.raffles.len() {
            bail!("no existe la rifa {}", index);
        }
        self.active = Some(index);
        Ok(&self.raffles[index])
    }

    pub fn create(
        &mut self,
        title: &str,
        prizes: &str,
        cost: u32,
        quantity: u32,
        mode: AllocationMode,
        theme: Option<String>,
    ) -> Result<usize> {
        if title.trim().is_empty() {
            bail!("el título es obligatorio");
        }
        if cost == 0 {
            bail!("el costo debe ser mayor a cero");
        }

        let extras = allocator::allocate(quantity, mode)?;
        let tickets = extras
            .into_iter()
            .enumerate()
            .map(|(i, hand)| Ticket::available(pad2(i as u32 + 1), hand))
            .collect();

        self.raffles.push(Raffle {
            title: title.trim().to_string(),
            prizes: prizes.trim().to_string(),
            cost,
            theme,
            logo: None,
            tickets,
        });

        let index = self.raffles.len() - 1;
        self.active = Some(index);
        Ok(index)
    }

    /// Field edit only; the ticket set never changes after creation.
    pub fn edit(
        &mut self,
        index: usize,
        title: &str,
        prizes: &str,
        cost: u32,
        theme: Option<String>,
    ) -> Result<()> {
        if title.trim().is_empty() {
            bail!("el título es obligatorio");
        }
        if cost == 0 {
            bail!("el costo debe ser mayor a cero");
        }

        let raffle = self.get_mut(index)?;
        raffle.title = title.trim().to_string();
        raffle.prizes = prizes.trim().to_string();
        raffle.cost = cost;
        if theme.is_some() {
            raffle.theme = theme;
        }
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<Raffle> {
        if index >= self.raffles.len() {
            bail!("no existe la rifa {}", index);
        }
        let removed = self.raffles.remove(index);

        self.active = match self.active {
            Some(a) if a == index => None,
            Some(a) if a > index => Some(a - 1),
            other => other,
        };
        Ok(removed)
    }

    pub fn stats(&self, index: usize) -> Result<RaffleStats> {
        let raffle = self.get(index)?;

        let mut stats = RaffleStats {
            total: raffle.tickets.len(),
            available: 0,
            reserved: 0,
            paid: 0,
            percent_taken: 0,
        };
        for ticket in &raffle.tickets {
            match ticket.status {
                TicketStatus::Available => stats.available += 1,
                TicketStatus::Reserved => stats.reserved += 1,
                TicketStatus::Paid => stats.paid += 1,
            }
        }
        if stats.total > 0 {
            let taken = stats.reserved + stats.paid;
            stats.percent_taken = (taken * 100 / stats.total) as u32;
        }
        Ok(stats)
    }

    fn check_selection(raffle: &Raffle, ticket_indices: &[usize]) -> Result<()> {
        if ticket_indices.is_empty() {
            bail!("selecciona al menos un boleto");
        }
        for &t in ticket_indices {
            if t >= raffle.tickets.len() {
                bail!("no existe el boleto {}", t);
            }
        }
        Ok(())
    }

    pub fn reserve(
        &mut self,
        index: usize,
        ticket_indices: &[usize],
        client: &str,
        phone: &str,
    ) -> Result<ReceiptData> {
        if client.trim().is_empty() {
            bail!("el nombre del cliente es obligatorio");
        }

        let raffle = self.get_mut(index)?;
        Self::check_selection(raffle, ticket_indices)?;

        let now = Utc::now();
        let mut receipt = ReceiptData {
            numbers: Vec::new(),
            client: client.trim().to_string(),
            extras: Vec::new(),
            total: 0,
            kind: ReceiptKind::Pending,
        };

        for &t in ticket_indices {
            let ticket = &mut raffle.tickets[t];
            ticket.status = TicketStatus::Reserved;
            ticket.client = client.trim().to_string();
            ticket.phone = phone.trim().to_string();
            ticket.assigned_at = Some(now);

            receipt.numbers.push(ticket.number.clone());
            receipt.extras.extend(ticket.extras.iter().cloned());
            receipt.total += raffle.cost as u64;
        }
        Ok(receipt)
    }

    /// Marks the selection paid. When the selected tickets already carry
    /// differing client names the caller must pass `confirm_mixed`; when
    /// none carries a name this is a counter sale and `fallback_client`
    /// is required. Missing names are back-filled either way.
    pub fn mark_paid(
        &mut self,
        index: usize,
        ticket_indices: &[usize],
        fallback_client: Option<&str>,
        confirm_mixed: bool,
    ) -> Result<PaidOutcome> {
        let raffle = self.get_mut(index)?;
        Self::check_selection(raffle, ticket_indices)?;

        let mut names: Vec<String> = Vec::new();
        for &t in ticket_indices {
            let client = raffle.tickets[t].client.trim();
            if !client.is_empty()
                && !names
                    .iter()
                    .any(|n| normalize_client_key(n) == normalize_client_key(client))
            {
                names.push(client.to_string());
            }
        }

        if names.len() > 1 && !confirm_mixed {
            return Ok(PaidOutcome::MixedClients(names));
        }

        let fallback = fallback_client.map(str::trim).unwrap_or("");
        if names.is_empty() && fallback.is_empty() {
            bail!("venta en mostrador: falta el nombre del cliente");
        }
        let fill = if fallback.is_empty() {
            names[0].clone()
        } else {
            fallback.to_string()
        };

        let now = Utc::now();
        let mut receipt = ReceiptData {
            numbers: Vec::new(),
            client: names.first().cloned().unwrap_or_else(|| fill.clone()),
            extras: Vec::new(),
            total: 0,
            kind: ReceiptKind::Paid,
        };

        for &t in ticket_indices {
            let ticket = &mut raffle.tickets[t];
            ticket.status = TicketStatus::Paid;
            if ticket.client.trim().is_empty() {
                ticket.client = fill.clone();
            }
            if ticket.assigned_at.is_none() {
                ticket.assigned_at = Some(now);
            }

            receipt.numbers.push(ticket.number.clone());
            receipt.extras.extend(ticket.extras.iter().cloned());
            receipt.total += raffle.cost as u64;
        }
        Ok(PaidOutcome::Done(receipt))
    }

    pub fn release(&mut self, index: usize, ticket_indices: &[usize]) -> Result<()> {
        self.bulk_update_status(index, ticket_indices, TicketStatus::Available)
    }

    /// Generic path; the only road from paid back to reserved/available.
    /// Moving to available clears the client so the status invariant holds.
    pub fn bulk_update_status(
        &mut self,
        index: usize,
        ticket_indices: &[usize],
        status: TicketStatus,
    ) -> Result<()> {
        let raffle = self.get_mut(index)?;
        Self::check_selection(raffle, ticket_indices)?;

        for &t in ticket_indices {
            let ticket = &mut raffle.tickets[t];
            ticket.status = status;
            if status == TicketStatus::Available {
                ticket.client.clear();
                ticket.phone.clear();
                ticket.assigned_at = None;
            }
        }
        Ok(())
    }

    /// Cascade scan: other tickets of the raffle held by the same client
    /// (normalized name or phone) as any ticket in the selection. Surfaced
    /// before a bulk change so a client's remaining tickets are not
    /// forgotten.
    pub fn find_related(&self, index: usize, ticket_indices: &[usize]) -> Result<Vec<RelatedTicket>> {
        let raffle = self.get(index)?;
        Self::check_selection(raffle, ticket_indices)?;

        let mut names = Vec::new();
        let mut phones = Vec::new();
        for &t in ticket_indices {
            let ticket = &raffle.tickets[t];
            let key = normalize_client_key(&ticket.client);
            if !key.is_empty() {
                names.push(key);
            }
            let phone = digits_only(&ticket.phone);
            if !phone.is_empty() {
                phones.push(phone);
            }
        }

        let mut related = Vec::new();
        for (i, ticket) in raffle.tickets.iter().enumerate() {
            if ticket_indices.contains(&i) {
                continue;
            }
            let key = normalize_client_key(&ticket.client);
            let phone = digits_only(&ticket.phone);

            let same_name = !key.is_empty() && names.contains(&key);
            let same_phone = !phone.is_empty() && phones.contains(&phone);
            if same_name || same_phone {
                related.push(RelatedTicket {
                    index: i,
                    number: ticket.number.clone(),
                    client: ticket.client.clone(),
                    status: ticket.status,
                });
            }
        }
        Ok(related)
    }
}
