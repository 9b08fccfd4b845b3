use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;

use crate::utils::digits_only;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageIntent {
    PaymentReminder,
    PaymentThanks,
}

/// Digits only; local 10-digit numbers get the configured country code.
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let digits = digits_only(raw);
    if digits.len() == 10 {
        format!("{}{}", country_code, digits)
    } else {
        digits
    }
}

pub fn compose_message(
    intent: MessageIntent,
    client: &str,
    raffle_title: &str,
    numbers: &[String],
    amount: u64,
) -> String {
    let tickets = numbers.join(", ");
    match intent {
        MessageIntent::PaymentReminder => format!(
            "Hola {client} 👋, te recordamos tus boletos {tickets} de la rifa \"{raffle_title}\". \
             Quedan ${amount} pendientes de pago. ¡No pierdas tus oportunidades!"
        ),
        MessageIntent::PaymentThanks => format!(
            "Hola {client} 🎉, ¡gracias por tu pago de ${amount}! Tus boletos {tickets} de la rifa \
             \"{raffle_title}\" quedan confirmados. ¡Mucha suerte!"
        ),
    }
}

/// WhatsApp deep link with the message preloaded.
pub fn wa_link(phone_raw: &str, country_code: &str, text: &str) -> Result<String> {
    let phone = normalize_phone(phone_raw, country_code);
    let url = Url::parse_with_params(&format!("https://wa.me/{}", phone), &[("text", text)])
        .context("no se pudo armar el enlace de WhatsApp")?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_digit_numbers_get_country_code() {
        assert_eq!(normalize_phone("55 1234 5678", "52"), "525512345678");
        assert_eq!(normalize_phone("(55) 1234-5678", "52"), "525512345678");
    }

    #[test]
    fn other_lengths_pass_through_as_digits() {
        assert_eq!(normalize_phone("+52 55 1234 5678", "52"), "525512345678");
        assert_eq!(normalize_phone("12345", "52"), "12345");
    }

    #[test]
    fn reminder_mentions_tickets_and_debt() {
        let msg = compose_message(
            MessageIntent::PaymentReminder,
            "Ana",
            "Rifa Guadalupana",
            &["01".to_string(), "05".to_string()],
            40,
        );
        assert!(msg.contains("Ana"));
        assert!(msg.contains("01, 05"));
        assert!(msg.contains("$40"));
        assert!(msg.contains("Rifa Guadalupana"));
    }

    #[test]
    fn thanks_confirms_payment() {
        let msg = compose_message(
            MessageIntent::PaymentThanks,
            "Beto",
            "Rifa",
            &["07".to_string()],
            20,
        );
        assert!(msg.contains("gracias"));
        assert!(msg.contains("07"));
    }

    #[test]
    fn wa_link_encodes_message() {
        let link = wa_link("5512345678", "52", "Hola Ana, boletos 01, 05").unwrap();
        assert!(link.starts_with("https://wa.me/525512345678?text="));
        assert!(!link.contains(' '));
    }

    #[test]
    fn intent_parses_from_kebab_case() {
        let intent: MessageIntent = serde_json::from_str("\"payment-reminder\"").unwrap();
        assert_eq!(intent, MessageIntent::PaymentReminder);
        let intent: MessageIntent = serde_json::from_str("\"payment-thanks\"").unwrap();
        assert_eq!(intent, MessageIntent::PaymentThanks);
    }
}
