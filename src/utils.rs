use regex::Regex;
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)\S+|\b[a-z0-9.-]+\.(?:com|org|net|io|gg|ly|be|co)(?:/\S*)?")
        .expect("url regex")
});

// Characters voices read out literally or choke on. Apostrophes inside words survive.
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s['’]|['’]\s|[\^_~@;#:\-%—“”‘"*/{}\[\]()\\|<>=]"#).expect("noise regex")
});

/// Cleans text for speech: strips links and symbols, spells out `+` and `&`,
/// collapses whitespace. Returns an empty string when nothing speakable is left.
pub fn sanitize_text(text: &str) -> String {
    let result = URL_RE.replace_all(text, " ");
    let result = result.replace('+', " plus ").replace('&', " and ");
    let result = NOISE_RE.replace_all(&result, " ");
    let words: Vec<&str> = result.split_whitespace().collect();
    if words.iter().all(|w| !w.chars().any(char::is_alphanumeric)) {
        return String::new();
    }
    words.join(" ")
}

/// Turns a post title into something safe to use as a file name.
pub fn name_normalize(name: &str) -> String {
    static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
        [
            (r#"[?\\"%*:|<>]"#, ""),
            (r"( [wW]\s?/\s?[oO0])", " without"),
            (r"( [wW]\s?/)", " with"),
            (r"(\d+)\s?/\s?(\d+)", "$1 of $2"),
            (r"(\w+)\s?/\s?(\w+)", "$1 or $2"),
            (r"/", ""),
        ]
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("name rule"), replacement))
        .collect()
    });

    let mut name = name.trim().to_string();
    for (re, replacement) in RULES.iter() {
        name = re.replace_all(&name, *replacement).into_owned();
    }
    let name: String = name.chars().filter(|c| !c.is_control()).take(200).collect();
    let name = name.trim().trim_end_matches('.').to_string();
    if name.is_empty() {
        "video".to_string()
    } else {
        name
    }
}

/// Keeps ids usable as directory names.
pub fn safe_id(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Cuts `text` to at most `max_chars` characters, backing off to the last word boundary.
pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let next_is_space = text
        .chars()
        .nth(max_chars)
        .map(char::is_whitespace)
        .unwrap_or(true);
    if next_is_space {
        return cut.trim_end().to_string();
    }
    match cut.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => cut[..pos].trim_end().to_string(),
        _ => cut,
    }
}

pub fn contains_blocked_word(text: &str, blocked: &[String]) -> Option<String> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    blocked
        .iter()
        .map(|b| b.trim().to_lowercase())
        .filter(|b| !b.is_empty())
        .find(|b| {
            if b.contains(' ') {
                lower.contains(b.as_str())
            } else {
                words.contains(&b.as_str())
            }
        })
}
