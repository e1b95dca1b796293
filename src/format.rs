use chrono::{DateTime, NaiveDateTime};

use crate::inbox::InboxStats;
use crate::types::{ChatTurn, Query, Role};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders an ISO-8601 timestamp for display. Offsets are kept as written;
/// anything unparseable comes back verbatim.
pub fn format_timestamp(ts: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(ts) {
        return parsed.format(DISPLAY_FORMAT).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(ts, pattern) {
            return parsed.format(DISPLAY_FORMAT).to_string();
        }
    }
    ts.to_string()
}

pub fn format_score(score: f64) -> String {
    format!("{score:.3}")
}

pub fn render_query(index: usize, query: &Query, draft: &str, sending: bool) -> String {
    let mut out = format!("#{index} {}", query.email);
    if let Some(ts) = &query.timestamp {
        out.push_str(&format!("  [{}]", format_timestamp(ts)));
    }
    if let Some(score) = query.score {
        out.push_str(&format!("  score {}", format_score(score)));
    }
    if query.auto_logged {
        out.push_str("  auto-logged");
    }
    if sending {
        out.push_str("  (sending...)");
    }
    out.push_str("\n  Q: ");
    out.push_str(&query.question);
    out.push('\n');
    if !draft.is_empty() {
        out.push_str("  draft: ");
        out.push_str(draft);
        out.push('\n');
    }
    out
}

pub fn render_transcript(turns: &[ChatTurn]) -> Option<String> {
    if turns.is_empty() {
        return None;
    }
    let mut out = String::new();
    for turn in turns {
        match turn.role {
            Role::User => out.push_str("You: "),
            Role::Assistant => out.push_str("Assistant: "),
        }
        out.push_str(&turn.content);
        out.push('\n');
    }
    Some(out)
}

pub fn render_stats(stats: &InboxStats) -> String {
    format!(
        "{} queries, {} awaiting a response, {} unique askers",
        stats.total, stats.pending, stats.unique_askers
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_in_common_shapes() {
        assert_eq!(format_timestamp("2025-06-01T09:30:00Z"), "2025-06-01 09:30:00");
        assert_eq!(
            format_timestamp("2025-06-01T09:30:00.123456"),
            "2025-06-01 09:30:00"
        );
        assert_eq!(
            format_timestamp("2025-06-01T09:30:00+05:30"),
            "2025-06-01 09:30:00"
        );
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn score_has_three_decimals() {
        assert_eq!(format_score(0.42), "0.420");
        assert_eq!(format_score(0.12345), "0.123");
    }

    #[test]
    fn query_card_shows_badges_and_draft() {
        let query = Query {
            email: "a@x.org".into(),
            question: "Fees?".into(),
            score: Some(0.25),
            timestamp: Some("2025-06-01T09:30:00".into()),
            auto_logged: true,
        };
        let card = render_query(1, &query, "See the fees page", true);
        assert_eq!(
            card,
            "#1 a@x.org  [2025-06-01 09:30:00]  score 0.250  auto-logged  (sending...)\n  Q: Fees?\n  draft: See the fees page\n"
        );
    }

    #[test]
    fn transcript_lines() {
        assert_eq!(render_transcript(&[]), None);
        let rendered = render_transcript(&[ChatTurn::user("Hi"), ChatTurn::assistant("Hello")]);
        assert_eq!(rendered.as_deref(), Some("You: Hi\nAssistant: Hello\n"));
    }
}
