//! Shared helper functions for SQL dialect implementations.
//!
//! Reusable building blocks that dialects compose to implement
//! `SqlDialect` with minimal duplication.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes, doubling embedded quotes.
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// =============================================================================
// Placeholders
// =============================================================================

/// Numbered placeholder: `$1`, `$2`, ...
pub fn placeholder_numbered(index: usize) -> String {
    format!("${}", index)
}


// =============================================================================
// Row cap
// =============================================================================

/// `LIMIT <expr>`
pub fn emit_limit_standard(limit: &TokenStream) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Limit).space().append(limit);
    ts
}

// =============================================================================
// Function Remapping
// =============================================================================

/// DuckDB ships `strip_accents` rather than the `unaccent` extension.
pub fn remap_function_duckdb(name: &str) -> Option<&'static str> {
    name.eq_ignore_ascii_case("UNACCENT").then_some("STRIP_ACCENTS")
}
