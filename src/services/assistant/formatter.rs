use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::error::AssistantError;
use super::types::{AssistantMessage, MessageContent};

static CITATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"【[^】]+】").unwrap());

static FENCED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());
static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"###[ \t]*(.*?)[ \t]*(\n|$)").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]*)`").unwrap());

/// Cleaned text of the newest message on the thread.
pub fn extract_reply(messages: &[AssistantMessage]) -> Result<String, AssistantError> {
    let first = messages.first().ok_or_else(|| {
        AssistantError::UnexpectedResponse("No response received from assistant".to_string())
    })?;
    debug!(
        "[FORMAT] reply: role={}, parts={}",
        first.role,
        first.content.len()
    );
    match first.content.first() {
        Some(MessageContent::Text(text)) => Ok(strip_citations(text).trim().to_string()),
        other => {
            warn!(
                "[FORMAT] non-text reply: kind={}",
                other.map(|part| part.kind()).unwrap_or("none")
            );
            Err(AssistantError::UnexpectedResponse(
                "Unexpected response format from assistant".to_string(),
            ))
        }
    }
}

pub fn strip_citations(text: &str) -> String {
    CITATION_RE.replace_all(text, "").into_owned()
}

/// Presentation markup for the chat widget. Applied on display only.
pub fn render_markup(text: &str) -> String {
    let escaped = escape_html(text);

    // Fenced blocks are pulled out first so inline rules leave them alone.
    let mut blocks: Vec<String> = Vec::new();
    let with_placeholders = FENCED_RE.replace_all(&escaped, |caps: &regex::Captures| {
        blocks.push(format!(
            "<pre><code class=\"block bg-gray-100 rounded p-2 my-2\">{}</code></pre>",
            &caps[1]
        ));
        format!("\u{0}{}\u{0}", blocks.len() - 1)
    });

    let html = HEADING_RE.replace_all(
        &with_placeholders,
        "<h3 class=\"text-lg font-semibold mt-2 mb-1\">$1</h3>",
    );
    let html = BOLD_RE.replace_all(&html, "<strong>$1</strong>");
    let html = ITALIC_RE.replace_all(&html, "<em>$1</em>");
    let html = INLINE_CODE_RE.replace_all(&html, "<code class=\"bg-gray-100 rounded px-1\">$1</code>");
    let mut html = html.replace('\n', "<br>");

    for (idx, block) in blocks.iter().enumerate() {
        html = html.replace(&format!("\u{0}{idx}\u{0}"), block);
    }
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{0}' => {}
            _ => out.push(ch),
        }
    }
    out
}
