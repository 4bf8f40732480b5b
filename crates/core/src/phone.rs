//! Phone number normalization
//!
//! Senders arrive in whatever shape the gateway hands us. Sessions and
//! history are keyed by the normalized form.

/// Normalize to an E.164-style string. Ten-digit numbers are assumed to be
/// North American. Returns an empty string when there are no digits.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('+') {
        return format!("+{}", digits);
    }
    match digits.len() {
        10 => format!("+1{}", digits),
        11 if digits.starts_with('1') => format!("+{}", digits),
        _ => format!("+{}", digits),
    }
}

/// Compare two numbers ignoring formatting and a leading country code 1.
pub fn phones_match(a: &str, b: &str) -> bool {
    let key = |raw: &str| {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.strip_prefix('1') {
            Some(rest) if rest.len() == 10 => rest.to_string(),
            _ => digits,
        }
    };
    let (ka, kb) = (key(a), key(b));
    !ka.is_empty() && ka == kb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(555) 010-2030"), "+15550102030");
        assert_eq!(normalize_phone("1-555-010-2030"), "+15550102030");
        assert_eq!(normalize_phone("+44 20 7946 0958"), "+442079460958");
        assert_eq!(normalize_phone("   "), "");
    }

    #[test]
    fn test_phones_match() {
        assert!(phones_match("+15550102030", "555-010-2030"));
        assert!(!phones_match("+15550102030", "+15550102031"));
        assert!(!phones_match("", ""));
    }
}
