//! Resume text normalisation for the category model.
//!
//! The model was trained on text passed through exactly this rule sequence,
//! case-sensitive as written. Order matters: URLs and tags go before
//! punctuation so `#rust` and `@handle` disappear as whole tokens rather than
//! leaving `rust` / `handle` behind. Lowercasing belongs to the model's
//! vectoriser and happens in `CategoryClassifier::classify`.

use std::sync::LazyLock;

use regex::Regex;

static RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"http\S+",
        r"RT|cc",
        r"#\S+",
        r"@\S+",
        r"[[:punct:]]",
        r"[^\x00-\x7F]",
    ]
    .into_iter()
    .map(|pattern| {
        Regex::new(pattern).unwrap_or_else(|e| panic!("bad clean rule {pattern}: {e}"))
    })
    .collect()
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap_or_else(|e| panic!("bad whitespace rule: {e}")));

/// Normalises resume text for the category model.
///
/// Each rule replaces its matches with a single space, then whitespace runs are
/// collapsed. Case is preserved. Idempotent.
pub fn clean_resume(text: &str) -> String {
    let mut cleaned = text.to_string();
    for rule in RULES.iter() {
        cleaned = rule.replace_all(&cleaned, " ").into_owned();
    }
    WHITESPACE.replace_all(&cleaned, " ").into_owned()
}
