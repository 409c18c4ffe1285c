use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
    static ref WORD_RE: Regex = Regex::new(r"\b\p{L}+\b").expect("valid regex");
    static ref QUERY_RE: Regex = Regex::new(r"\b\w+\b").expect("valid regex");
}

/// Replaces every markup tag with a single space.
pub fn strip_tags(raw: &str) -> String {
    TAG_RE.replace_all(raw, " ").into_owned()
}

/// Alphabetic words of a raw document, tags stripped and lowercased.
pub fn words(raw: &str) -> Vec<String> {
    let text = strip_tags(raw).to_lowercase();
    WORD_RE.find_iter(&text).map(|m| m.as_str().to_string()).collect()
}

/// Word tokens of a free-text query, case-folded.
pub fn query_terms(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    QUERY_RE.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

/// Whitespace tokens used for term frequencies of extracted document text.
pub fn text_tokens(text: &str) -> Vec<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_terms_ignore_punctuation_and_case() {
        assert_eq!(query_terms("TERM1, Term2."), vec!["term1", "term2"]);
        assert!(query_terms("  !? ").is_empty());
    }

    #[test]
    fn words_handle_cyrillic() {
        assert_eq!(words("<p>Привет, Мир</p>"), vec!["привет", "мир"]);
    }
}
