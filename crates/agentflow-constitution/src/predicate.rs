use std::sync::LazyLock;

use regex::Regex;

/// Normalized output longer than this many characters violates `output-too-long`.
pub const MAX_OUTPUT_CHARS: usize = 1000;

const PII_PATTERNS: &[(&str, &str)] = &[
  (r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}", "email address"),
  (r"\b\d{3}-\d{2}-\d{4}\b", "social security number"),
  (r"(?:\+?\d{1,2}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b", "phone number"),
  (r"\bssn\b", "ssn mention"),
  (r"\baddress\b", "address mention"),
];

const HARMFUL_PATTERN: &str = r"\b(?:violence|violent|kill|killing|murder|attack|weapon|hate|hateful|racist|racism|sexist|discriminate|discrimination|discriminatory|slur|terrorist|terrorism)\b";

/// Compiled regex cache. Invalid patterns are skipped with a warning.
struct Patterns {
  pii: Vec<(Regex, &'static str)>,
  harmful: Option<Regex>,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| {
  let pii = PII_PATTERNS
    .iter()
    .filter_map(|(pattern, label)| compile(pattern).map(|re| (re, *label)))
    .collect();
  Patterns {
    pii,
    harmful: compile(HARMFUL_PATTERN),
  }
});

fn compile(pattern: &str) -> Option<Regex> {
  match Regex::new(pattern) {
    Ok(re) => Some(re),
    Err(e) => {
      tracing::warn!(
        pattern = %pattern,
        error = %e,
        "invalid constitution pattern, skipping"
      );
      None
    }
  }
}

/// Returns the label of the first PII-like pattern found in normalized text.
pub fn contains_pii(text: &str) -> Option<&'static str> {
  PATTERNS
    .pii
    .iter()
    .find(|(re, _)| re.is_match(text))
    .map(|(_, label)| *label)
}

pub fn contains_harmful_content(text: &str) -> bool {
  PATTERNS
    .harmful
    .as_ref()
    .is_some_and(|re| re.is_match(text))
}

pub fn exceeds_length(text: &str) -> bool {
  text.chars().count() > MAX_OUTPUT_CHARS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pii_patterns() {
    assert_eq!(contains_pii("contact user@example.com"), Some("email address"));
    assert_eq!(contains_pii("ssn on file"), Some("ssn mention"));
    assert_eq!(contains_pii("123-45-6789"), Some("social security number"));
    assert_eq!(contains_pii("call 555-123-4567 today"), Some("phone number"));
    assert_eq!(contains_pii("ship to this address"), Some("address mention"));
    assert_eq!(contains_pii("no sensitive data here"), None);
  }

  #[test]
  fn test_pii_tokens_need_word_boundaries() {
    assert_eq!(contains_pii("addressing the issue"), None);
    assert_eq!(contains_pii("classnames"), None);
    assert_eq!(contains_pii("order 42 shipped"), None);
  }

  #[test]
  fn test_harmful_tokens() {
    assert!(contains_harmful_content("they plan an attack"));
    assert!(contains_harmful_content("racist remarks"));
    assert!(!contains_harmful_content("skills and skillful people"));
    assert!(!contains_harmful_content("a friendly summary"));
  }

  #[test]
  fn test_length_threshold() {
    assert!(!exceeds_length(&"a".repeat(MAX_OUTPUT_CHARS)));
    assert!(exceeds_length(&"a".repeat(MAX_OUTPUT_CHARS + 1)));
  }
}
