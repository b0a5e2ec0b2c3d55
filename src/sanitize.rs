use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid email format")]
pub struct InvalidEmail;

fn script_blocks() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script pattern is valid")
    })
}

fn inline_handlers() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\s*on\w+\s*=\s*["'][^"']*["']"#).expect("handler pattern is valid")
    })
}

fn javascript_scheme() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)javascript:").expect("scheme pattern is valid"))
}

fn html_tags() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn email_shape() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

struct MarkdownRules {
    h3: Regex,
    h2: Regex,
    h1: Regex,
    bold: Regex,
    italic: Regex,
}

fn markdown_rules() -> &'static MarkdownRules {
    static RULES: OnceLock<MarkdownRules> = OnceLock::new();
    RULES.get_or_init(|| MarkdownRules {
        h3: Regex::new(r"(?im)^### (.*)$").expect("h3 pattern is valid"),
        h2: Regex::new(r"(?im)^## (.*)$").expect("h2 pattern is valid"),
        h1: Regex::new(r"(?im)^# (.*)$").expect("h1 pattern is valid"),
        bold: Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern is valid"),
        italic: Regex::new(r"\*([^*]+)\*").expect("italic pattern is valid"),
    })
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Strips script blocks, inline event handlers and `javascript:` schemes, then escapes what is
/// left for display.
pub fn sanitize_input(input: &str) -> String {
    let without_scripts = script_blocks().replace_all(input, "");
    let without_handlers = inline_handlers().replace_all(&without_scripts, "");
    let without_scheme = javascript_scheme().replace_all(&without_handlers, "");
    escape_html(&without_scheme)
}

/// The shape check runs on the input as given, so surrounding whitespace is rejected. Tags are
/// stripped and the address lower-cased afterwards; the cleaned address must still pass the check.
pub fn sanitize_email(email: &str) -> Result<String, InvalidEmail> {
    if !email_shape().is_match(email) {
        return Err(InvalidEmail);
    }
    let candidate = html_tags().replace_all(email, "").trim().to_lowercase();
    if !email_shape().is_match(&candidate) {
        return Err(InvalidEmail);
    }
    Ok(candidate)
}

/// Normalized `http`/`https` URL, or `"#"` for anything else. With `allowed_hosts`, the host must
/// be one of them.
pub fn sanitize_url(url: &str, allowed_hosts: Option<&[&str]>) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "#".to_string();
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return "#".to_string();
    }
    if let Some(allowed_hosts) = allowed_hosts {
        let host = parsed.host_str().unwrap_or_default();
        if !allowed_hosts.contains(&host) {
            return "#".to_string();
        }
    }
    parsed.to_string()
}

/// Escapes `markdown`, then renders `#` to `###` headings, `**bold**`, `*italic*` and line breaks.
pub fn markdown_to_safe_html(markdown: &str) -> String {
    let rules = markdown_rules();
    let html = escape_html(markdown);
    let html = rules.h3.replace_all(&html, "<h3>$1</h3>");
    let html = rules.h2.replace_all(&html, "<h2>$1</h2>");
    let html = rules.h1.replace_all(&html, "<h1>$1</h1>");
    let html = rules.bold.replace_all(&html, "<strong>$1</strong>");
    let html = rules.italic.replace_all(&html, "<em>$1</em>");
    html.replace('\n', "<br />")
}

/// Drops path separators, NUL bytes and parent-directory runs.
pub fn sanitize_file_name(file_name: &str) -> String {
    let mut cleaned = String::with_capacity(file_name.len());
    for ch in file_name.chars() {
        match ch {
            '/' | '\\' | '\0' => {}
            '.' if cleaned.ends_with('.') => {}
            other => cleaned.push(other),
        }
    }
    cleaned.trim().to_string()
}
