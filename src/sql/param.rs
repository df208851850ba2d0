//! Bind parameters.
//!
//! Every caller-supplied value that reaches a statement is pushed here and
//! referenced by position. The SQL text only ever contains placeholders.

use chrono::NaiveDate;
use serde::Serialize;

use super::expr::Expr;

/// A typed bind value.
///
/// Typed so the database driver can bind dates as dates and integers as
/// integers instead of handing the server untyped text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Param {
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Param {
    /// Type name used in logs and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Param::Int(_) => "int",
            Param::Float(_) => "float",
            Param::Text(_) => "text",
            Param::Date(_) => "date",
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.into())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Text(s)
    }
}

impl From<i64> for Param {
    fn from(n: i64) -> Self {
        Param::Int(n)
    }
}

impl From<f64> for Param {
    fn from(f: f64) -> Self {
        Param::Float(f)
    }
}

impl From<NaiveDate> for Param {
    fn from(d: NaiveDate) -> Self {
        Param::Date(d)
    }
}

/// Ordered parameter list under construction.
///
/// Placeholder numbers are assigned in push order, so statements must be
/// built in textual order for dialects with anonymous placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: Vec<Param>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value and return the placeholder expression referencing it.
    pub fn push(&mut self, value: impl Into<Param>) -> Expr {
        self.values.push(value.into());
        Expr::Param(self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_vec(self) -> Vec<Param> {
        self.values
    }
}
