//! Phone number normalization to the canonical `62…` form used for
//! WhatsApp delivery. The rewrite rules run in order on the digit string
//! and the result is gated by a final shape check, so a number either
//! normalizes cleanly or is reported as a miss. Callers keep the raw
//! input on a miss.

/// Normalize an arbitrary phone string to `62` + national number.
///
/// Returns `None` when the input has no digits or the rewritten number
/// fails the final `62` + 8..=13 digit check.
pub fn normalize(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return None;
    }

    let phone = if let Some(rest) = digits.strip_prefix("620") {
        // 6208xxx -> 628xxx (stray trunk zero after the country code)
        format!("62{}", rest)
    } else if digits.starts_with("62") {
        digits
    } else if let Some(rest) = digits.strip_prefix('0') {
        // 08xxx -> 628xxx
        format!("62{}", rest)
    } else if digits.starts_with('8') {
        // bare subscriber number
        format!("62{}", digits)
    } else {
        // other formats, prepend the country code and hope
        format!("62{}", digits)
    };

    let national = &phone[2..];
    if (8..=13).contains(&national.len()) && national.chars().all(|c| c.is_ascii_digit()) {
        Some(phone)
    } else {
        None
    }
}

pub fn is_valid(raw: &str) -> bool {
    normalize(raw).is_some()
}

/// Human-facing rendering (`+62 812 3456 7890`). Falls back to the raw
/// input when normalization misses, matching the lenient storage contract.
pub fn format_display(raw: &str) -> String {
    match normalize(raw) {
        Some(normalized) if normalized.len() >= 10 => format!(
            "+{} {} {} {}",
            &normalized[..2],
            &normalized[2..5],
            &normalized[5..9],
            &normalized[9..]
        ),
        Some(normalized) => format!("+{}", normalized),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_trunk_prefix_becomes_country_code() {
        assert_eq!(normalize("081234567890").as_deref(), Some("6281234567890"));
    }

    #[test]
    fn bare_subscriber_number_gets_country_code() {
        assert_eq!(normalize("8123456789").as_deref(), Some("628123456789"));
    }

    #[test]
    fn stray_zero_after_country_code_is_dropped() {
        assert_eq!(normalize("6208123456789").as_deref(), Some("628123456789"));
    }

    #[test]
    fn canonical_input_is_unchanged() {
        assert_eq!(normalize("6281234567890").as_deref(), Some("6281234567890"));
    }

    #[test]
    fn punctuation_is_stripped() {
        assert_eq!(normalize("+62 812-3456-789").as_deref(), Some("628123456789"));
    }

    #[test]
    fn no_digits_is_rejected() {
        assert_eq!(normalize("abc"), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn too_short_after_prefix_is_rejected() {
        assert_eq!(normalize("621234"), None);
    }

    #[test]
    fn too_long_is_rejected() {
        assert_eq!(normalize("6281234567890123456"), None);
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["081234567890", "8123456789", "6208123456789", "628999112233"] {
            let once = normalize(input).unwrap();
            assert_eq!(normalize(&once).as_deref(), Some(once.as_str()));
        }
    }

    #[test]
    fn validity_mirrors_normalization() {
        assert!(is_valid("081234567890"));
        assert!(!is_valid("abc"));
        assert!(!is_valid("621234"));
    }

    #[test]
    fn display_formatting() {
        assert_eq!(format_display("081234567890"), "+62 812 3456 7890");
        assert_eq!(format_display("not a phone"), "not a phone");
    }
}
