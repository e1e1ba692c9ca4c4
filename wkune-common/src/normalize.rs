//! Item normalization for duplicate detection
//!
//! Items keep their original spelling for display; comparisons go through
//! [`normalize_item`], which drops whitespace and punctuation and folds case.
//! Only ASCII letters and digits survive, so "Pizza!" and " pizza " collide.

/// Reduce an item to its comparison key.
///
/// Pure and total. The key may be empty (e.g. "!!!"), which callers treat
/// as invalid input.
pub fn normalize_item(item: &str) -> String {
    item.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Two items are equal when their comparison keys match.
pub fn items_equal(a: &str, b: &str) -> bool {
    normalize_item(a) == normalize_item(b)
}

/// True if `candidate` normalizes to nothing or to the key of any existing item.
pub fn is_duplicate_item<S: AsRef<str>>(candidate: &str, existing: &[S]) -> bool {
    let key = normalize_item(candidate);
    if key.is_empty() {
        return true;
    }
    existing.iter().any(|item| normalize_item(item.as_ref()) == key)
}

/// Deduplicate by comparison key, keeping the first spelling seen.
pub fn dedup_items<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(normalize_item(item)) {
            out.push(item.clone());
        }
    }
    out
}
