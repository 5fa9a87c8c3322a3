//! Tag-glob expansion against a known tag table.

/// Why a tag glob failed to expand, before it is turned into a [`crate::error::ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobError {
    /// The glob matched no tag in the table.
    ZeroMatches,
    /// The glob is a bare `*`, which would silently select every tag.
    Ambiguous,
    /// The glob contains characters outside `[A-Za-z0-9_*]`, or is empty.
    Malformed,
}

/// Expands `glob` against `tags`, returning the indices of every tag it
/// selects.
///
/// A glob ending in `*` matches every tag with that literal prefix;
/// otherwise it must match a tag name exactly.
pub fn expand(tags: &[&str], glob: &str) -> Result<Vec<usize>, GlobError> {
    if glob.is_empty() || !glob.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '*') {
        return Err(GlobError::Malformed);
    }
    if glob == "*" {
        return Err(GlobError::Ambiguous);
    }

    let matches: Vec<usize> = if let Some(prefix) = glob.strip_suffix('*') {
        if prefix.is_empty() {
            return Err(GlobError::Ambiguous);
        }
        tags.iter()
            .enumerate()
            .filter(|(_, t)| t.starts_with(prefix))
            .map(|(i, _)| i)
            .collect()
    } else {
        tags.iter()
            .enumerate()
            .filter(|(_, t)| **t == glob)
            .map(|(i, _)| i)
            .collect()
    };

    if matches.is_empty() {
        Err(GlobError::ZeroMatches)
    } else {
        Ok(matches)
    }
}
