//! Input validators shared by account and student handling.

/// Validate email address format.
///
/// Basic shape checks only:
/// - exactly one `@`
/// - non-empty local part and a dotted domain with non-empty labels
/// - length between 3 and 255 characters
///
/// # Examples
///
/// ```
/// use kms_auth::utils::is_valid_email;
///
/// assert!(is_valid_email("keydesk@campus.example.edu"));
/// assert!(!is_valid_email("keydesk"));
/// assert!(!is_valid_email("@campus.edu"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let valid_local = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    local.chars().all(valid_local)
        && domain.chars().all(valid_domain)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Whether `value` is exactly `len` ASCII digits.
///
/// # Examples
///
/// ```
/// use kms_auth::utils::is_digit_string;
///
/// assert!(is_digit_string("0123456789", 10));
/// assert!(!is_digit_string("012345678", 10));
/// assert!(!is_digit_string("01234567a9", 10));
/// ```
#[must_use]
pub fn is_digit_string(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Normalise an e-mail for storage and lookup (trimmed, lowercase).
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user+tag@example.com"));
        assert!(is_valid_email("user_name@subdomain.example.com"));
        assert!(is_valid_email("a@b.c"));
    }

    #[test]
    fn invalid_emails() {
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user@example..com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email(&format!("{}@example.com", "a".repeat(250))));
    }

    #[test]
    fn normalises_email() {
        assert_eq!(normalize_email("  Admin@Campus.EDU "), "admin@campus.edu");
    }

    proptest! {
        #[test]
        fn digit_strings_of_exact_length_accepted(s in "[0-9]{14}") {
            prop_assert!(is_digit_string(&s, 14));
            prop_assert!(!is_digit_string(&s, 10));
        }

        #[test]
        fn any_non_digit_rejected(prefix in "[0-9]{0,9}", bad in "[^0-9]", suffix in "[0-9]{0,9}") {
            let value = format!("{prefix}{bad}{suffix}");
            prop_assert!(!is_digit_string(&value, value.len()));
        }
    }
}
