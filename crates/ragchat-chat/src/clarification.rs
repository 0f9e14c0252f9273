//! Candidate-column extraction for clarification responses.
//!
//! The backend lists the candidate columns inside its prompt text, e.g.
//! `Please choose a column: ['name', 'email']`. Scraping that text is a
//! best-effort fallback; a structured `columns` field wins when present.

use regex::Regex;
use std::sync::LazyLock;

use ragchat_client::QueryResponse;

/// First bracketed group on a line, non-greedy.
static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("Invalid bracket regex"));

/// Extract candidate columns from a clarification prompt.
///
/// Takes the first `[...]` group, splits it on commas and strips quote
/// characters and whitespace from each token. Returns an empty list when no
/// group is found or no token survives.
pub fn parse_columns(text: &str) -> Vec<String> {
    let Some(found) = BRACKET_RE.find(text) else {
        tracing::debug!("No column list found in clarification text");
        return Vec::new();
    };
    let inner = &found.as_str()[1..found.as_str().len() - 1];
    inner
        .split(',')
        .map(|token| {
            token
                .chars()
                .filter(|c| *c != '\'' && *c != '"')
                .collect::<String>()
                .trim()
                .to_string()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Candidate columns for a clarification response.
pub fn columns_for(response: &QueryResponse) -> Vec<String> {
    match &response.columns {
        Some(columns) => columns.clone(),
        None => parse_columns(&response.result_text()),
    }
}
