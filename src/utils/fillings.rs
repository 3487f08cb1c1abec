//! Welcome template fillings.

/// Text substituted for `{rules}`.
pub const RULES_FILLING: &str = "the rules";

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// HTML mention link for a user.
pub fn mention(user_id: u64, name: &str) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user_id,
        html_escape(name)
    )
}

/// Substitute `{name}`, `{mention}`, `{chat}` and `{rules}` in one pass.
/// Substituted text is never scanned again, and unknown keys stay as written.
pub fn apply_welcome_fillings(template: &str, user_id: u64, name: &str, chat_title: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            rest = tail;
            break;
        };

        match &tail[1..close] {
            "name" => out.push_str(&html_escape(name)),
            "mention" => out.push_str(&mention(user_id, name)),
            "chat" => out.push_str(&html_escape(chat_title)),
            "rules" => out.push_str(RULES_FILLING),
            _ => {
                // Re-scan from the next byte so "{{name}" still fills.
                out.push('{');
                rest = &tail[1..];
                continue;
            }
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_welcome_fillings() {
        let text = apply_welcome_fillings("Hi {name}, {mention}! {chat} / {rules}", 42, "A<b>", "Cats & Dogs");
        assert_eq!(
            text,
            "Hi A&lt;b&gt;, <a href=\"tg://user?id=42\">A&lt;b&gt;</a>! Cats &amp; Dogs / the rules"
        );
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        assert_eq!(apply_welcome_fillings("{other}", 1, "x", "y"), "{other}");
        assert_eq!(apply_welcome_fillings("{{name}", 1, "x", "y"), "{x");
        assert_eq!(apply_welcome_fillings("open { brace", 1, "x", "y"), "open { brace");
    }

    #[test]
    fn test_user_text_is_not_rescanned() {
        let text = apply_welcome_fillings("{name} joined {chat}", 1, "{chat}", "Lobby");
        assert_eq!(text, "{chat} joined Lobby");

        let text = apply_welcome_fillings("{chat}: {name}", 1, "Eve", "{mention}");
        assert_eq!(text, "{mention}: Eve");
    }
}
