/// Two-digit zero-padded ticket/chance representation. 100 wraps to "00".
pub fn pad2(value: u32) -> String {
    format!("{:02}", value % 100)
}

/// Case and whitespace insensitive client key used for grouping and
/// cascade matching.
pub fn normalize_client_key(name: &str) -> String {
    name.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Strips everything that is not safe in a downloadable filename.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        "Cliente".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad2_pads_and_wraps() {
        assert_eq!(pad2(7), "07");
        assert_eq!(pad2(42), "42");
        assert_eq!(pad2(100), "00");
    }

    #[test]
    fn normalize_client_key_cases() {
        assert_eq!(normalize_client_key("Ana"), "ana");
        assert_eq!(normalize_client_key("  ANA  LUISA "), "ana luisa");
        assert_eq!(normalize_client_key("ana luisa"), "ana luisa");
    }

    #[test]
    fn digits_only_strips_formatting() {
        assert_eq!(digits_only("(55) 1234-5678"), "5512345678");
        assert_eq!(digits_only("+52 55 1234 5678"), "525512345678");
    }

    #[test]
    fn sanitize_filename_cases() {
        assert_eq!(sanitize_filename("Ana Luisa"), "Ana_Luisa");
        assert_eq!(sanitize_filename("José/Pérez"), "JosPrez");
        assert_eq!(sanitize_filename("   "), "Cliente");
    }
}
