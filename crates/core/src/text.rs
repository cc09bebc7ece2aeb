//! Text Processing
//!
//! Cleanup helpers for the free-form text the upstream agents emit:
//! markdown stripping for plain-text summaries, HTML escaping plus light
//! markup for the narrative block, and the small label formatters the UI
//! renders. Everything here is pure string work; `strip_markdown_summary`
//! is idempotent so already-cleaned text passes through unchanged.

use serde_json::Value;

/// JavaScript-style truthiness for JSON values: `null`, `false`, `0`,
/// and the empty string are falsy, everything else is truthy.
pub(crate) fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Lowercase, then capitalize the first character of each
/// whitespace-separated word.
pub fn title_case(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape the five HTML-special characters. Applied before any markup
/// substitution so inserted tags are never themselves escaped.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// If `value` is a JSON object literal carrying one of the known text
/// fields, pull that text out; otherwise return the input unchanged.
///
/// Agents sometimes hand back their whole structured payload where a
/// sentence was expected; the useful text then hides under
/// `highlightSummary`/`summary` (short form) or
/// `detailedSummary`/`analysis` (long form).
pub fn extract_text_from_json(value: &str) -> String {
    let trimmed = value.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return value.to_string();
    }
    let Ok(parsed) = serde_json::from_str::<Value>(trimmed) else {
        return value.to_string();
    };
    if !parsed.is_object() {
        return value.to_string();
    }

    let highlight = parsed
        .get("highlightSummary")
        .filter(|v| json_truthy(v))
        .or_else(|| parsed.get("summary").filter(|v| json_truthy(v)));
    if let Some(Value::String(text)) = highlight {
        return text.clone();
    }

    let detailed = parsed
        .get("detailedSummary")
        .filter(|v| json_truthy(v))
        .or_else(|| parsed.get("analysis").filter(|v| json_truthy(v)));
    if let Some(Value::String(text)) = detailed {
        return text.clone();
    }

    value.to_string()
}

// Strips a leading run of 1-6 '#' characters plus following whitespace.
// Only fires at column zero, matching how agents emit headings.
fn strip_heading(line: &str) -> &str {
    if !line.starts_with('#') {
        return line;
    }
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes > 6 {
        return line;
    }
    line[hashes..].trim_start()
}

fn rewrite_list_marker(line: &str) -> String {
    let indent_len = line.len() - line.trim_start().len();
    let body = &line[indent_len..];

    // - or * bullets become the UI's canonical bullet
    if (body.starts_with('-') || body.starts_with('*'))
        && body[1..].starts_with(|c: char| c.is_whitespace())
    {
        return format!("• {}", body[1..].trim_start());
    }

    // numbered lists keep their number but lose the indent
    let digits = body.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && body[digits..].starts_with('.') {
        let rest = &body[digits + 1..];
        if rest.starts_with(|c: char| c.is_whitespace()) {
            return format!("{}. {}", &body[..digits], rest.trim_start());
        }
    }

    line.to_string()
}

/// Reduce a markdown-flavored agent summary to plain text.
///
/// Heading markers are dropped, bullets normalize to `•`, bold/italic/
/// code markers and stray `~` are removed, and runs of 3+ newlines
/// collapse to a blank line. Running the function over its own output
/// returns it unchanged.
pub fn strip_markdown_summary(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let extracted = extract_text_from_json(value);
    let normalized = extracted.replace("\r\n", "\n");

    let mut cleaned = normalized
        .lines()
        .map(|line| rewrite_list_marker(strip_heading(line)))
        .collect::<Vec<_>>()
        .join("\n");

    cleaned = cleaned.replace("**", "");
    cleaned = cleaned.replace("__", "");
    cleaned = cleaned.replace('`', "");
    cleaned = cleaned.replace('~', "");
    while cleaned.contains("\n\n\n") {
        cleaned = cleaned.replace("\n\n\n", "\n\n");
    }
    cleaned.trim().to_string()
}

// Replaces paired occurrences of `delim` with open/close tags, one line
// at a time; an unpaired trailing delimiter is left as-is.
fn replace_delimited(line: &str, delim: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find(delim) {
        let after = &rest[start + delim.len()..];
        match after.find(delim) {
            Some(end) => {
                out.push_str(&rest[..start]);
                out.push_str(open);
                out.push_str(&after[..end]);
                out.push_str(close);
                rest = &after[end + delim.len()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Render the narrative block as sanitized HTML.
///
/// Escapes first, then substitutes bold/bullet markup, drops horizontal
/// rules, and wraps blank-line-separated blocks in `<p>` with `<br/>`
/// for inner newlines. Returns `None` when nothing renderable remains.
pub fn format_narrative(narrative: &str) -> Option<String> {
    if narrative.is_empty() {
        return None;
    }
    let escaped = escape_html(narrative).replace("\r\n", "\n");

    let marked = escaped
        .lines()
        .map(|line| {
            let line = strip_heading(line);
            let line = replace_delimited(line, "**", "<strong>", "</strong>");
            let line = replace_delimited(&line, "__", "<strong>", "</strong>");
            let mut line = if let Some(rest) = line.strip_prefix("- ") {
                format!("• {rest}")
            } else {
                line
            };
            if line.trim() == "---" {
                line.clear();
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    let paragraphs = marked
        .trim()
        .split("\n\n")
        .map(|block| block.replace('\n', "<br/>"))
        .filter(|block| !block.is_empty())
        .map(|block| format!("<p>{block}</p>"))
        .collect::<String>();

    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs)
    }
}

/// Human label for a workflow status value; `None`/empty means the item
/// is still pending.
pub fn format_status_label(value: Option<&str>) -> String {
    let cleaned = value.unwrap_or("").replace('_', " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return "Pending".to_string();
    }
    title_case(cleaned)
}

/// Display label for a normalized agent status; the default `info`
/// status renders as `Insight`.
pub fn format_agent_status_label(status: Option<&str>) -> String {
    match status {
        None | Some("") => "Insight".to_string(),
        Some("info") => "Insight".to_string(),
        Some(other) => title_case(other),
    }
}

/// Section title for the analysis summary, keyed off the query type the
/// orchestrator classified.
pub fn summary_title_for_query(query_type: Option<&str>) -> &'static str {
    let normalized = query_type.unwrap_or("").to_lowercase();
    if normalized.contains("fulfillment") {
        "Fulfillment Summary"
    } else if normalized.contains("inventory") {
        "Inventory Summary"
    } else if normalized.contains("demand") {
        "Demand Summary"
    } else if normalized.contains("logistics") {
        "Logistics Summary"
    } else if normalized.contains("risk") {
        "Risk Summary"
    } else if normalized.contains("capacity") {
        "Capacity Planning Summary"
    } else {
        "Analysis Summary"
    }
}
