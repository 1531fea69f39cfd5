//! Email reply extraction.
//!
//! Pure functions that turn a relayed email into something a ticket can
//! thread: the correlation identifier from the subject, the sender identity
//! from the `From` header, and the new content of the body with quoted history
//! and signatures removed.
//!
//! Quote and signature detection is heuristic. When in doubt the cleaner stops
//! early, so a reply may lose a trailing line but never gains quoted history.

use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// `[#<36 hex-or-hyphen chars>]` anywhere in a subject.
static TICKET_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[#([0-9a-f-]{36})\]").expect("invalid ticket tag pattern"));

/// Any `[#...]` token, recognized or not.
static ANY_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[#([^\]]*)\]").expect("invalid tag pattern"));

/// `"Display Name" <address>` or `Display Name <address>`.
static SENDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*"?([^"<]*?)"?\s*<([^<>]+)>\s*$"#).expect("invalid sender pattern")
});

static STYLE_BLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("invalid style pattern"));

static SCRIPT_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("invalid script pattern")
});

static HTML_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("invalid HTML tag pattern"));

static BLANK_RUN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("invalid blank line pattern"));

static ATTRIBUTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^On\s.*\bwrote:").expect("invalid attribution pattern"));

static RULE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-{3,}|_{3,})").expect("invalid rule pattern"));

/// Signature openers added by mobile and desktop clients.
const CLIENT_SIGNATURES: [&str; 2] = ["Sent from my", "Get Outlook"];

/// Extracts the ticket correlation identifier from a subject line.
///
/// Returns the bracket contents verbatim, case preserved.
pub fn extract_ticket_id(subject: &str) -> Option<&str> {
    TICKET_TAG_REGEX
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// True when the subject carries a `[#...]` tag that is not a ticket identifier.
///
/// A relay that rewrites identifiers, or a change in identifier format, shows
/// up here instead of silently dropping every reply.
pub fn has_unrecognized_tag(subject: &str) -> bool {
    extract_ticket_id(subject).is_none() && ANY_TAG_REGEX.is_match(subject)
}

/// Appends the correlation tag for `ticket_id` unless the subject has it.
pub fn subject_with_tag(subject: &str, ticket_id: &Uuid) -> String {
    let tag = format!("[#{}]", ticket_id);
    let already_tagged = extract_ticket_id(subject)
        .map(|id| id.eq_ignore_ascii_case(&ticket_id.to_string()))
        .unwrap_or(false);

    if already_tagged {
        subject.to_string()
    } else if subject.trim().is_empty() {
        tag
    } else {
        format!("{} {}", subject.trim_end(), tag)
    }
}

/// Sender identity parsed from a `From` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSender {
    /// Display name, when the header carried a non-empty one
    pub name: Option<String>,
    pub email: String,
}

/// Parses a `From` header.
///
/// Headers without the `<address>` form are taken whole as the address.
pub fn parse_sender(from: &str) -> ParsedSender {
    if let Some(caps) = SENDER_REGEX.captures(from) {
        let name = caps
            .get(1)
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let email = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();

        return ParsedSender {
            name,
            email: email.to_string(),
        };
    }

    ParsedSender {
        name: None,
        email: from.trim().to_string(),
    }
}

/// Lower-cases and trims an address for use as a rate limit key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Derives plain text from an HTML body.
pub fn html_to_text(html: &str) -> String {
    let text = STYLE_BLOCK_REGEX.replace_all(html, "");
    let text = SCRIPT_BLOCK_REGEX.replace_all(&text, "");
    let text = HTML_TAG_REGEX.replace_all(&text, "\n");

    // &amp; last so "&amp;lt;" stays "&lt;"
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");

    BLANK_RUN_REGEX
        .replace_all(&text, "\n\n")
        .trim()
        .to_string()
}

/// Returns the new content of a reply.
///
/// The plain-text part wins when it has content; otherwise text is derived
/// from the HTML part. The result is empty when nothing new remains.
pub fn clean_body(text: Option<&str>, html: Option<&str>) -> String {
    let source = match (text, html) {
        (Some(text), _) if !text.trim().is_empty() => text.to_string(),
        (_, Some(html)) if !html.trim().is_empty() => html_to_text(html),
        _ => return String::new(),
    };

    strip_quoted_reply(&source)
}

/// Keeps the lines above the first quote or signature marker.
pub fn strip_quoted_reply(body: &str) -> String {
    let kept: Vec<&str> = body
        .lines()
        .take_while(|line| !is_quote_marker(line) && !is_signature_marker(line))
        .collect();

    kept.join("\n").trim().to_string()
}

/// Start of quoted history: `>` lines, attributions, and separator rules.
fn is_quote_marker(line: &str) -> bool {
    line.starts_with('>') || ATTRIBUTION_REGEX.is_match(line) || RULE_REGEX.is_match(line)
}

fn is_signature_marker(line: &str) -> bool {
    if line.trim_end() == "--" {
        return true;
    }

    CLIENT_SIGNATURES.iter().any(|prefix| line.starts_with(prefix))
}
