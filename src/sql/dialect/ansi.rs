//! ANSI SQL dialect.
//!
//! Used for dialect-neutral previews of compiled statements. It has no
//! aggregate FILTER clause, so filtered counts fall back to CASE expressions.

use super::super::token::{Token, TokenStream};

use super::helpers;
use super::SqlDialect;

#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn emit_limit(&self, limit: &TokenStream) -> TokenStream {
        // FETCH FIRST n ROWS ONLY
        let mut ts = TokenStream::new();
        ts.push(Token::Fetch)
            .space()
            .push(Token::First)
            .space()
            .append(limit)
            .space()
            .push(Token::Rows)
            .space()
            .push(Token::Only);
        ts
    }
}
