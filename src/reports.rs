use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::types::{Raffle, ReceiptData, ReceiptKind, TicketStatus};
use crate::utils::sanitize_filename;

const DEFAULT_THEME: &str = "#991b1b";

/// Name the raster collaborator must give the exported image.
pub fn receipt_image_filename(data: &ReceiptData) -> String {
    format!(
        "Ticket-{}-{}.png",
        data.kind.file_label(),
        sanitize_filename(&data.client)
    )
}

fn receipt_html_filename(data: &ReceiptData) -> String {
    format!(
        "Ticket-{}-{}.html",
        data.kind.file_label(),
        sanitize_filename(&data.client)
    )
}

pub fn grid_image_filename(raffle: &Raffle) -> String {
    format!("Lista-{}.png", sanitize_filename(&raffle.title))
}

fn grid_html_filename(raffle: &Raffle) -> String {
    format!("Lista-{}.html", sanitize_filename(&raffle.title))
}

/// Renders the receipt as a self-contained page: red header card with the
/// status and amount, white card with participant, tickets and chances.
/// The raster collaborator turns this into the downloadable image.
pub fn generate_receipt_html(raffle: &Raffle, data: &ReceiptData) -> String {
    let theme = raffle.theme.as_deref().unwrap_or(DEFAULT_THEME);
    let status_line = match data.kind {
        ReceiptKind::Pending => "BOLETO APARTADO",
        ReceiptKind::Paid => "BOLETO PAGADO",
    };

    let mut title = raffle.title.to_uppercase();
    if title.chars().count() > 28 {
        title = title.chars().take(28).collect::<String>() + "...";
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <title>{status_line} - {client}</title>
    <style>
        body {{
            font-family: 'Segoe UI', Arial, sans-serif;
            background: #e5e5e5;
            margin: 0;
            padding: 20px;
            width: 460px;
        }}
        .brand {{
            color: {theme};
            text-align: center;
            font-size: 1.8em;
            font-weight: 700;
            margin-bottom: 15px;
        }}
        .amount-card {{
            background: {theme};
            color: white;
            border-radius: 20px;
            padding: 25px;
            text-align: center;
        }}
        .amount-card .status {{
            font-size: 1.3em;
            font-weight: 700;
        }}
        .amount-card .label {{
            font-size: 0.8em;
            opacity: 0.8;
            margin-top: 12px;
        }}
        .amount-card .amount {{
            font-size: 3em;
            font-weight: 700;
        }}
        .detail-card {{
            background: white;
            border-radius: 20px;
            padding: 25px;
            margin-top: 15px;
        }}
        .field-label {{
            color: #9ca3af;
            font-size: 0.7em;
            font-weight: 700;
            margin-top: 18px;
        }}
        .field-value {{
            color: #1f2937;
            font-weight: 700;
            font-size: 1.2em;
            border-bottom: 2px solid #f3f4f6;
            padding-bottom: 10px;
        }}
        .numbers {{
            font-size: 2em;
        }}
        .extras {{
            font-family: monospace;
            color: #4b5563;
            border-top: 2px dashed #d1d5db;
            padding-top: 12px;
        }}
        .footer {{
            text-align: center;
            color: #9ca3af;
            font-size: 0.8em;
            font-weight: 700;
            margin-top: 20px;
        }}
    </style>
</head>
<body>
    <div class="brand">{brand}</div>
    <div class="amount-card">
        <div class="status">{status_line}</div>
        <div class="label">MONTO</div>
        <div class="amount">${total}.00</div>
    </div>
    <div class="detail-card">
        <div class="field-label">RIFA NO. / TÍTULO</div>
        <div class="field-value">{title}<br><small>BOLETO ${cost} PESOS</small></div>
        <div class="field-label">PARTICIPANTE</div>
        <div class="field-value">{client}</div>
        <div class="field-label">BOLETOS</div>
        <div class="field-value numbers">{numbers}</div>
        <div class="field-label">OPORTUNIDADES</div>
        <div class="extras">{extras}</div>
    </div>
    <div class="footer">GRACIAS POR SU APOYO</div>
</body>
</html>
"#,
        status_line = status_line,
        client = data.client.to_uppercase(),
        theme = theme,
        brand = title,
        total = data.total,
        title = title,
        cost = raffle.cost,
        numbers = data.numbers.join(", "),
        extras = data.extras.join(" - "),
    )
}

/// Whole-raffle grid, one card per ticket with its status and chances.
/// The analog of exporting the sales board as an image.
pub fn generate_grid_html(raffle: &Raffle) -> String {
    let theme = raffle.theme.as_deref().unwrap_or(DEFAULT_THEME);
    let mut cards = String::new();

    for ticket in &raffle.tickets {
        let status_class = match ticket.status {
            TicketStatus::Available => "available",
            TicketStatus::Reserved => "reserved",
            TicketStatus::Paid => "paid",
        };
        let holder = if ticket.client.is_empty() {
            ticket.status.display_name().to_string()
        } else {
            ticket.client.clone()
        };

        cards.push_str(&format!(
            r#"        <div class="ticket {status_class}">
            <div class="number">{number}</div>
            <div class="holder">{holder}</div>
            <div class="extras">{extras}</div>
        </div>
"#,
            status_class = status_class,
            number = ticket.number,
            holder = holder,
            extras = ticket.extras.join(", "),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{ font-family: 'Segoe UI', Arial, sans-serif; background: #f8f9ff; padding: 20px; }}
        h1 {{ color: {theme}; }}
        .grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(130px, 1fr)); gap: 10px; }}
        .ticket {{ background: white; border: 2px solid #e2e8f0; border-radius: 8px; padding: 10px; }}
        .ticket.reserved {{ border-color: #feca57; background: #fffbea; }}
        .ticket.paid {{ border-color: #10b981; background: #ecfdf5; }}
        .number {{ font-size: 1.5em; font-weight: 700; }}
        .holder {{ color: #555; font-size: 0.9em; }}
        .extras {{ color: #999; font-size: 0.8em; border-top: 1px solid #eee; margin-top: 5px; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p>{prizes} — boleto ${cost}</p>
    <div class="grid">
{cards}    </div>
</body>
</html>
"#,
        title = raffle.title,
        theme = theme,
        prizes = raffle.prizes,
        cost = raffle.cost,
        cards = cards,
    )
}

pub fn save_html_to_path(html_content: &str, filename: &str, report_path: &str) -> Result<()> {
    let filepath = Path::new(report_path).join(filename);

    if let Some(parent) = filepath.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&filepath)?;
    file.write_all(html_content.as_bytes())?;
    Ok(())
}

/// Renders and stores the receipt page, returning the filename the image
/// export must use.
pub fn generate_and_save_receipt(
    raffle: &Raffle,
    data: &ReceiptData,
    report_path: &str,
) -> Result<String> {
    let html = generate_receipt_html(raffle, data);
    save_html_to_path(&html, &receipt_html_filename(data), report_path)?;
    Ok(receipt_image_filename(data))
}

pub fn generate_and_save_grid(raffle: &Raffle, report_path: &str) -> Result<String> {
    let html = generate_grid_html(raffle);
    save_html_to_path(&html, &grid_html_filename(raffle), report_path)?;
    Ok(grid_image_filename(raffle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RaffleStore;
    use crate::types::AllocationMode;

    fn sample() -> (Raffle, ReceiptData) {
        let mut store = RaffleStore::default();
        store
            .create("Rifa Guadalupana", "Pantalla", 20, 33, AllocationMode::Linear, None)
            .unwrap();
        let receipt = store.reserve(0, &[0, 1], "Ana Luisa", "5512345678").unwrap();
        (store.get(0).unwrap().clone(), receipt)
    }

    #[test]
    fn filename_convention() {
        let (_, mut receipt) = sample();
        assert_eq!(receipt_image_filename(&receipt), "Ticket-Pending-Ana_Luisa.png");

        receipt.kind = ReceiptKind::Paid;
        assert_eq!(receipt_image_filename(&receipt), "Ticket-Paid-Ana_Luisa.png");
    }

    #[test]
    fn receipt_html_carries_all_fields() {
        let (raffle, receipt) = sample();
        let html = generate_receipt_html(&raffle, &receipt);

        assert!(html.contains("BOLETO APARTADO"));
        assert!(html.contains("ANA LUISA"));
        assert!(html.contains("$40.00"));
        assert!(html.contains("01, 02"));
        assert!(html.contains("34 - 67 - 35 - 68"));
        assert!(html.contains("RIFA GUADALUPANA"));
    }

    #[test]
    fn receipt_uses_theme_color() {
        let (mut raffle, receipt) = sample();
        raffle.theme = Some("#2563eb".to_string());
        let html = generate_receipt_html(&raffle, &receipt);
        assert!(html.contains("#2563eb"));
        assert!(!html.contains(DEFAULT_THEME));
    }

    #[test]
    fn long_titles_are_clipped() {
        let (mut raffle, receipt) = sample();
        raffle.title = "Una rifa con un título larguísimo que no cabe".to_string();
        let html = generate_receipt_html(&raffle, &receipt);
        assert!(html.contains("UNA RIFA CON UN TÍTULO LARGU..."));
    }

    #[test]
    fn grid_lists_every_ticket() {
        let (raffle, _) = sample();
        let html = generate_grid_html(&raffle);
        for ticket in &raffle.tickets {
            assert!(html.contains(&format!(">{}<", ticket.number)));
        }
        assert!(html.contains("Ana Luisa"));
        assert_eq!(grid_image_filename(&raffle), "Lista-Rifa_Guadalupana.png");
    }
}
