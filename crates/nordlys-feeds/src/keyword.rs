//! Keyword token preparation.
//!
//! Keyword lists arrive as free-form strings from the feeds TOML. Before
//! they are embedded in a `websearch_to_tsquery` expression each token is
//! normalized: trimmed, lowercased, phrases quoted, and a trailing `*`
//! (prefix match) carried outside the quotes. Preparation is idempotent so
//! already-prepared tokens pass through unchanged.

/// Prepare a single keyword token. Returns `None` for blank tokens.
pub fn prepare_token(token: &str) -> Option<String> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut prepared = trimmed.to_lowercase();

    let wildcard = prepared.ends_with('*');
    if wildcard {
        prepared.pop();
    }

    let already_quoted =
        prepared.len() >= 2 && prepared.starts_with('"') && prepared.ends_with('"');
    if prepared.contains(' ') && !already_quoted {
        prepared = format!("\"{prepared}\"");
    }

    if wildcard {
        prepared.push('*');
    }

    Some(prepared)
}

/// Prepare a keyword list into a single `OR` expression.
/// Returns `None` when no token survives preparation.
pub fn prepare_list(tokens: &[String]) -> Option<String> {
    let prepared: Vec<String> = tokens.iter().filter_map(|t| prepare_token(t)).collect();
    if prepared.is_empty() {
        None
    } else {
        Some(prepared.join(" OR "))
    }
}
