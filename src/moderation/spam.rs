//! Fixed spam keyword list for thread replies from new accounts.

/// Accounts younger than this are subject to the keyword check.
pub const SPAM_CHECK_MAX_AGE_DAYS: u32 = 7;

const SPAM_KEYWORDS: &[&str] = &[
    "http://",
    "https://",
    "купить",
    "заказать",
    "скидка",
    "распродажа",
];

/// Case-insensitive substring match against the keyword list.
pub fn contains_spam(text: &str) -> bool {
    let lower = text.to_lowercase();
    SPAM_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_spam() {
        assert!(contains_spam("see HTTPS://example.com"));
        assert!(contains_spam("Большая СКИДКА сегодня"));
        assert!(!contains_spam("hello there"));
        assert!(!contains_spam(""));
    }
}
