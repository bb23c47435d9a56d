//! Message sequence assembly.

use quotarelay_core::{Message, Turn};
use quotarelay_memory::ContextEntry;

/// Identity and behavior text sent first on every request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are QuotaRelay, a concise and friendly assistant \
serving a shared community chat. Answer clearly, keep replies short unless asked for detail, \
and say so plainly when you do not know something. Treat repository memory as background \
facts curated by the community; prefer it over guesses when it is relevant.";

/// Render repository notes as a system message body, or `None` when empty.
pub fn format_context(entries: &[ContextEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let mut ctx = String::from("Latest repository memory (most recent first):");
    for entry in entries {
        ctx.push_str(&format!(
            "\n- [{}] {}",
            entry.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            entry.content
        ));
    }
    Some(ctx)
}

/// Build the ordered request: identity, context, history, then the new prompt.
pub fn build_messages(
    system_prompt: &str,
    context: &[ContextEntry],
    history: &[Turn],
    prompt: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(Message::system(system_prompt));
    if let Some(ctx) = format_context(context) {
        messages.push(Message::system(ctx));
    }
    messages.extend(history.iter().map(Message::from));
    messages.push(Message::user(prompt));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use quotarelay_core::Role;

    #[test]
    fn no_context_no_context_message() {
        let messages = build_messages("sys", &[], &[], "hello");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn order_is_identity_context_history_prompt() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let context = vec![
            ContextEntry::new(ts, "newest note"),
            ContextEntry::new(ts, "older note"),
        ];
        let history = vec![Turn::user("q1"), Turn::assistant("a1")];

        let messages = build_messages("sys", &context, &history, "q2");
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(
            messages[1].content,
            "Latest repository memory (most recent first):\n\
             - [2026-01-02T03:04:05Z] newest note\n\
             - [2026-01-02T03:04:05Z] older note"
        );
        assert_eq!(messages[4].content, "q2");
    }
}
