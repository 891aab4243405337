use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

/// Function words dropped by [`normalize`].
pub const STOPWORDS: [&str; 19] = [
    "el", "la", "los", "las", "de", "del", "en", "por", "para", "con", "que", "y", "a", "un",
    "una", "al", "se", "su", "sus",
];

lazy_static! {
    // `\w` is Unicode-aware, so accented letters stay inside their token.
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("static pattern is valid");
    static ref STOPWORD_SET: HashSet<&'static str> = STOPWORDS.iter().copied().collect();
}

/// Lowercases `text` and splits it on runs of non-word characters.
///
/// Empty tokens produced by leading or trailing delimiters are discarded.
/// No stopword filtering happens here; this is what the vocabulary is built from.
pub fn split_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_WORD
        .split(&lowered)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Returns true if `token` is in the fixed stopword list.
pub fn is_stopword(token: &str) -> bool {
    STOPWORD_SET.contains(token)
}

/// Normalizes raw text into the token sequence used for feature extraction.
///
/// Steps, in order:
/// 1. Lowercase the whole text
/// 2. Split on runs of non-word characters, dropping empty tokens
/// 3. Drop stopwords
///
/// Order and duplicates are preserved.
///
/// # Example
/// ```
/// use scat::classifier::normalize;
///
/// let tokens = normalize("El trabajador quedó atrapado entre dos máquinas.");
/// assert_eq!(tokens, vec!["trabajador", "quedó", "atrapado", "entre", "dos", "máquinas"]);
/// ```
pub fn normalize(text: &str) -> Vec<String> {
    split_tokens(text)
        .into_iter()
        .filter(|token| !is_stopword(token))
        .collect()
}

/// Joins the normalized tokens back into a single space-separated string.
pub fn normalize_text(text: &str) -> String {
    normalize(text).join(" ")
}
