//! URL slug derivation for categories and products.
//!
//! Lowercases, keeps ASCII alphanumerics, and collapses every other run of
//! characters into a single hyphen. Used when a category or product is
//! created without an explicit slug.

/// Derive a URL slug from a display name.
///
/// Returns `None` when the name contains no usable characters (the caller
/// should reject such names rather than store an empty slug).
pub fn slugify(name: &str) -> Option<String> {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}
