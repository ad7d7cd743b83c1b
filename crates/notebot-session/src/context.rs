//! Conversation context handed to the answer-generation step.

use chrono::{DateTime, Utc};
use notebot_types::{Message, Role, truncate_chars};
use serde::Serialize;

/// Hard cap on `conversation_summary`, in characters.
pub const MAX_SUMMARY_CHARS: usize = 500;

/// Leading words of a question kept as its topic.
const TOPIC_WORDS: usize = 5;

/// Topics named in the summary line.
const SUMMARY_TOPICS: usize = 3;

/// Topics listed in the document context.
const MAX_MAIN_TOPICS: usize = 5;

/// Document name reported when nothing has been uploaded.
const UNKNOWN_DOCUMENT: &str = "Unknown";

/// One user question and the assistant reply that immediately followed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
    /// When the reply was recorded.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentContext {
    pub document_name: String,
    pub main_topics: Vec<String>,
}

/// Compact view of the recent conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationContext {
    /// Chronological, at most `last_n` entries.
    pub recent_exchanges: Vec<Exchange>,
    pub conversation_summary: String,
    pub document_context: DocumentContext,
    pub total_messages: usize,
}

/// Build the context from the tail of `messages`.
pub fn build(
    messages: &[Message],
    last_n: usize,
    document_name: Option<&str>,
) -> ConversationContext {
    let recent_exchanges = recent_exchanges(messages, last_n);

    let mut topics: Vec<String> = Vec::new();
    for exchange in &recent_exchanges {
        let topic = topic_of(&exchange.user);
        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }

    let conversation_summary = if topics.is_empty() {
        String::new()
    } else {
        let summary = format!(
            "Discussion about: {}",
            topics
                .iter()
                .take(SUMMARY_TOPICS)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        truncate_chars(&summary, MAX_SUMMARY_CHARS).to_string()
    };

    topics.truncate(MAX_MAIN_TOPICS);

    ConversationContext {
        recent_exchanges,
        conversation_summary,
        document_context: DocumentContext {
            document_name: document_name.unwrap_or(UNKNOWN_DOCUMENT).to_string(),
            main_topics: topics,
        },
        total_messages: messages.len(),
    }
}

/// Walk backward collecting adjacent (user, assistant) pairs.
///
/// Anything that is not such a pair is stepped over one message at a time.
fn recent_exchanges(messages: &[Message], last_n: usize) -> Vec<Exchange> {
    let mut exchanges = Vec::new();
    if messages.len() < 2 {
        return exchanges;
    }

    let mut i = messages.len() - 1;
    while i >= 1 && exchanges.len() < last_n {
        let (question, answer) = (&messages[i - 1], &messages[i]);
        if answer.role() == Role::Assistant && question.role() == Role::User {
            exchanges.push(Exchange {
                user: question.content().to_string(),
                assistant: answer.content().to_string(),
                timestamp: answer.timestamp(),
            });
            i = i.saturating_sub(2);
        } else {
            i -= 1;
        }
    }

    exchanges.reverse();
    exchanges
}

fn topic_of(question: &str) -> String {
    question
        .split_whitespace()
        .take(TOPIC_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: Role, text: &str) -> Message {
        Message::new(role, text, None).unwrap()
    }

    fn qa(pairs: &[(&str, &str)]) -> Vec<Message> {
        pairs
            .iter()
            .flat_map(|(q, a)| [msg(Role::User, q), msg(Role::Assistant, a)])
            .collect()
    }

    #[test]
    fn empty_history() {
        let ctx = build(&[], 5, None);
        assert!(ctx.recent_exchanges.is_empty());
        assert_eq!(ctx.conversation_summary, "");
        assert_eq!(ctx.document_context.document_name, "Unknown");
        assert!(ctx.document_context.main_topics.is_empty());
        assert_eq!(ctx.total_messages, 0);
    }

    #[test]
    fn collects_pairs_in_order() {
        let msgs = qa(&[("What is AI?", "AI is..."), ("Tell me more", "AI involves...")]);
        let ctx = build(&msgs, 5, Some("ai.pdf"));

        assert_eq!(ctx.total_messages, 4);
        assert_eq!(ctx.recent_exchanges.len(), 2);
        assert_eq!(ctx.recent_exchanges[0].user, "What is AI?");
        assert_eq!(ctx.recent_exchanges[1].assistant, "AI involves...");
        assert_eq!(ctx.document_context.document_name, "ai.pdf");
    }

    #[test]
    fn exchange_timestamp_is_the_reply() {
        let msgs = qa(&[("q", "a")]);
        let ctx = build(&msgs, 1, None);
        assert_eq!(ctx.recent_exchanges[0].timestamp, msgs[1].timestamp());
    }

    #[test]
    fn respects_last_n_from_tail() {
        let msgs = qa(&[("q0", "a0"), ("q1", "a1"), ("q2", "a2")]);
        let ctx = build(&msgs, 2, None);
        let users: Vec<_> = ctx.recent_exchanges.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, ["q1", "q2"]);
    }

    #[test]
    fn zero_last_n_yields_no_exchanges() {
        let msgs = qa(&[("q0", "a0")]);
        let ctx = build(&msgs, 0, None);
        assert!(ctx.recent_exchanges.is_empty());
        assert_eq!(ctx.total_messages, 2);
    }

    #[test]
    fn skips_unpaired_messages() {
        let msgs = vec![
            msg(Role::User, "q0"),
            msg(Role::Assistant, "a0"),
            msg(Role::User, "lost question"),
            msg(Role::User, "q1"),
            msg(Role::Assistant, "a1"),
            msg(Role::User, "pending"),
        ];
        let ctx = build(&msgs, 5, None);
        let pairs: Vec<_> = ctx
            .recent_exchanges
            .iter()
            .map(|e| (e.user.as_str(), e.assistant.as_str()))
            .collect();
        assert_eq!(pairs, [("q0", "a0"), ("q1", "a1")]);
    }

    #[test]
    fn assistant_first_is_not_a_pair() {
        let msgs = vec![msg(Role::Assistant, "hello"), msg(Role::User, "hi")];
        assert!(build(&msgs, 5, None).recent_exchanges.is_empty());
    }

    #[test]
    fn topics_use_first_five_words() {
        let msgs = qa(&[("one two three four five six seven", "ok")]);
        let ctx = build(&msgs, 5, None);
        assert_eq!(ctx.document_context.main_topics, ["one two three four five"]);
        assert_eq!(
            ctx.conversation_summary,
            "Discussion about: one two three four five"
        );
    }

    #[test]
    fn summary_names_three_distinct_topics() {
        let msgs = qa(&[
            ("alpha", "a"),
            ("alpha", "a"),
            ("beta", "b"),
            ("gamma", "c"),
            ("delta", "d"),
        ]);
        let ctx = build(&msgs, 5, None);
        assert_eq!(ctx.conversation_summary, "Discussion about: alpha, beta, gamma");
        assert_eq!(ctx.document_context.main_topics.len(), 4);
    }

    #[test]
    fn main_topics_capped_at_five() {
        let msgs = qa(&[
            ("t1", "a"),
            ("t2", "a"),
            ("t3", "a"),
            ("t4", "a"),
            ("t5", "a"),
            ("t6", "a"),
        ]);
        let ctx = build(&msgs, 10, None);
        assert_eq!(ctx.recent_exchanges.len(), 6);
        assert_eq!(ctx.document_context.main_topics.len(), 5);
    }

    #[test]
    fn summary_capped_at_500_chars() {
        let word = "w".repeat(400);
        let question = format!("{word} {word}");
        let msgs = qa(&[(question.as_str(), "a"), ("other", "b")]);
        let ctx = build(&msgs, 5, None);
        assert_eq!(ctx.conversation_summary.chars().count(), MAX_SUMMARY_CHARS);
        assert!(ctx.conversation_summary.starts_with("Discussion about: "));
    }
}
