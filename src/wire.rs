//! Text-level pieces of the HTTP protocol: placeholder substitution,
//! output-format forcing and server error message extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::{ClickHouseError, Params};

pub(crate) const PLACEHOLDER: char = '?';

/// Output format every streamed statement is rewritten to.
pub(crate) const STREAM_FORMAT: &str = "TabSeparatedWithNames";

static TRAILING_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:FORMAT\s+[A-Za-z0-9_]+)?\s*;?\s*$").expect("static regex is valid")
});

static HTML_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>[^<]+</title>").expect("static regex is valid"));

/// Substitutes each `?` in `sql` with the next argument rendered as a
/// literal. The placeholder and argument counts must match.
pub(crate) fn encode_statement(sql: &str, args: &Params) -> Result<String, ClickHouseError> {
    let placeholders = sql.matches(PLACEHOLDER).count();
    if placeholders != args.len() {
        return Err(ClickHouseError::ArgumentCountMismatch {
            placeholders,
            args: args.len(),
        });
    }

    let mut out = String::with_capacity(sql.len());
    let mut args = args.0.iter().peekable();
    for ch in sql.chars() {
        match args.next_if(|_| ch == PLACEHOLDER) {
            Some(value) => value.marshal_into(&mut out),
            None => out.push(ch),
        }
    }
    Ok(out)
}

/// Drops a trailing `FORMAT <name>` clause and statement terminator, then
/// appends `FORMAT TabSeparatedWithNames`.
pub(crate) fn force_stream_format(sql: &str) -> String {
    let replacement = format!(" FORMAT {STREAM_FORMAT}");
    TRAILING_FORMAT
        .replace(sql, regex::NoExpand(&replacement))
        .into_owned()
}

/// Extracts the error message from a non-success response body.
///
/// HTML pages yield their first `<title>` element, tags included; any
/// other body is returned verbatim.
pub(crate) fn decode_error_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.starts_with('<') {
        if let Some(title) = HTML_TITLE.find(&text) {
            return title.as_str().to_owned();
        }
    }
    text.into_owned()
}
