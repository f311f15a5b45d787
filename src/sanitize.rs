use once_cell::sync::Lazy;
use regex::Regex;

// Keep prompts <= 250 chars (roughly 100 tokens).
const MAX_LEN: usize = 250;

static INJECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // role / instruction hijacking
        r"(?i)\b(?:ignore|disregard|override)[^.\n]*?(?:system|previous|prior|developer|assistant)\b",
        // explicit role field in JSON
        r#"(?i)"\s*role"\s*:\s*""#,
        // opening of code block or long delimiters
        r"(?s)(?:```|~~~|<<|>>|\|-)",
        // attempts to break JSON via comment tokens
        r"(?s)/\*\*|//",
        // MIME / header injection
        r"(?i)content\s*-\s*type\s*:",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("sanitizer pattern must compile"))
    .collect()
});

/// Gate applied before any prompt reaches the language model. Enforces the
/// length limit, rejects control characters and scans for known jailbreak
/// shapes. Rejected prompts are answered with the unsupported sentinel, not
/// an error.
pub fn is_safe_prompt(text: &str) -> bool {
    if text.chars().count() > MAX_LEN {
        return false;
    }
    if text
        .chars()
        .any(|c| matches!(c, '\u{00}'..='\u{1f}' | '\u{7f}'))
    {
        return false;
    }
    !INJECTION_PATTERNS.iter().any(|pattern| pattern.is_match(text))
}
