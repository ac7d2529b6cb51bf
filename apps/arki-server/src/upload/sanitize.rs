//! Filename sanitization
//!
//! Turns an attacker-controlled upload name into a single path component
//! that is safe to join onto the ingestion directory.

use unicode_normalization::UnicodeNormalization;

use super::types::{IngestError, ALLOWED_EXTENSIONS, MAX_STORAGE_NAME_BYTES};

/// Reduce `name` to `[A-Za-z0-9_.-]`, with no directory part.
///
/// Mirrors the usual "secure filename" rules: NFKD-normalize and drop
/// non-ASCII, turn path separators into whitespace, join whitespace runs
/// with `_`, collapse dot runs, then strip leading/trailing `.` and `_`.
/// The result may be empty.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();

    let spaced: String = ascii
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let mut filtered = String::with_capacity(joined.len());
    for c in joined.chars() {
        let keep = c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-');
        // ".." never survives, even inside a single component
        if keep && !(c == '.' && filtered.ends_with('.')) {
            filtered.push(c);
        }
    }

    filtered.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Lower-cased extension of `name`, if it has one
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Check the extension allow-list against the name the client sent
pub fn is_allowed(name: &str) -> bool {
    extension_of(name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Validate and sanitize an upload name in one step.
///
/// Returns the storage name: sanitized, with a non-empty stem and a
/// lower-case allowed extension. Over-long stems are cut so the name, and
/// every output name derived from it, fits in one path component.
pub fn storage_name(original: &str) -> Result<String, IngestError> {
    if original.trim().is_empty() {
        return Err(IngestError::EmptyFilename);
    }
    if !is_allowed(original) {
        return Err(IngestError::DisallowedExtension(original.to_string()));
    }

    let sanitized = secure_filename(original);
    let (stem, ext) = sanitized
        .rsplit_once('.')
        .ok_or_else(|| IngestError::InvalidFilename(original.to_string()))?;

    let ext = ext.to_ascii_lowercase();
    // Sanitized names are ASCII, so any byte index is a char boundary
    let max_stem = MAX_STORAGE_NAME_BYTES.saturating_sub(ext.len() + 1);
    let stem = &stem[..stem.len().min(max_stem)];
    let stem = stem.trim_end_matches(['.', '_']);
    if stem.is_empty() || !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(IngestError::InvalidFilename(original.to_string()));
    }

    Ok(format!("{}.{}", stem, ext))
}
