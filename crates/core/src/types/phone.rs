//! Phone number normalization for the fallback lookup path.

/// Normalize a phone number to its significant trailing digits.
///
/// Strips every non-digit character, then drops a leading country prefix or
/// trunk zero when more than ten digits remain. Two numbers that normalize
/// equal are treated as the same shipping contact. Never fails: garbage in,
/// empty string out.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 10 {
        let start = digits.len() - 10;
        digits.get(start..).unwrap_or(&digits).to_string()
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_formatting() {
        assert_eq!(normalize_phone("98765-43210"), "9876543210");
        assert_eq!(normalize_phone("(987) 654 3210"), "9876543210");
    }

    #[test]
    fn test_drops_country_prefix() {
        assert_eq!(normalize_phone("+91 98765 43210"), "9876543210");
        assert_eq!(normalize_phone("09876543210"), "9876543210");
    }

    #[test]
    fn test_short_numbers_pass_through() {
        assert_eq!(normalize_phone("43210"), "43210");
    }

    #[test]
    fn test_garbage_becomes_empty() {
        assert_eq!(normalize_phone("not a phone"), "");
    }
}
