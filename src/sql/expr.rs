//! Expression AST for the analytics statements.
//!
//! Covers exactly what the compiler, the metric catalog and the segment
//! builders emit. Request values never become literals: they are collected
//! in a [`Params`](super::param::Params) list and referenced through
//! [`Expr::Param`].

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Unqualified column reference.
    Column(String),

    /// Literal built from static input (metric definitions, date units).
    Literal(Literal),

    /// Positional bind parameter (1-based).
    Param(usize),

    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// `NAME([DISTINCT] args...)`
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },

    /// Aggregate restricted to rows matching `filter`.
    ///
    /// Renders as `FUNC(arg) FILTER (WHERE filter)` where the dialect supports
    /// it and as `FUNC(CASE WHEN filter THEN arg END)` elsewhere. A missing
    /// `arg` counts rows.
    FilteredAggregate {
        name: String,
        arg: Option<Box<Expr>>,
        filter: Box<Expr>,
    },

    /// Searched CASE: `CASE WHEN c THEN v ... [ELSE e] END`
    Case {
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },

    Cast { expr: Box<Expr>, data_type: SqlType },

    /// `expr IN (values...)`; an empty list renders as `FALSE`.
    InList { expr: Box<Expr>, values: Vec<Expr> },

    /// `expr BETWEEN low AND high`, inclusive on both ends.
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },

    /// `*` inside `COUNT(*)`.
    Star,

    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Text(String),
    Null,
}

/// CAST targets: integer counts and calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Date,
}

impl SqlType {
    fn type_name(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Date => "DATE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Minus,
    Mul,
    Div,
    Like,
}

impl BinaryOperator {
    fn token(self) -> Token {
        match self {
            BinaryOperator::Eq => Token::Eq,
            BinaryOperator::Ne => Token::Ne,
            BinaryOperator::Lt => Token::Lt,
            BinaryOperator::Gt => Token::Gt,
            BinaryOperator::Lte => Token::Lte,
            BinaryOperator::Gte => Token::Gte,
            BinaryOperator::And => Token::And,
            BinaryOperator::Minus => Token::Minus,
            BinaryOperator::Mul => Token::Mul,
            BinaryOperator::Div => Token::Div,
            BinaryOperator::Like => Token::Like,
        }
    }
}

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

// =============================================================================
// Expression to Tokens
// =============================================================================

impl Expr {
    /// Convert this expression to a token stream for a specific dialect.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        self.write_tokens(&mut ts, dialect);
        ts
    }

    fn write_tokens(&self, ts: &mut TokenStream, dialect: Dialect) {
        match self {
            Expr::Column(name) => {
                ts.push(Token::Ident(name.clone()));
            }
            Expr::Literal(Literal::Int(n)) => {
                ts.push(Token::LitInt(*n));
            }
            Expr::Literal(Literal::Text(s)) => {
                ts.push(Token::LitString(s.clone()));
            }
            Expr::Literal(Literal::Null) => {
                ts.push(Token::LitNull);
            }
            Expr::Param(index) => {
                ts.push(Token::Placeholder(*index));
            }
            Expr::BinaryOp { left, op, right } => {
                left.write_tokens(ts, dialect);
                ts.space().push(op.token()).space();
                right.write_tokens(ts, dialect);
            }
            Expr::Function {
                name,
                args,
                distinct,
            } => {
                ts.push(Token::FunctionName(name.clone())).lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                write_list(ts, args, dialect);
                ts.rparen();
            }
            Expr::FilteredAggregate { name, arg, filter } => {
                ts.push(Token::FunctionName(name.clone())).lparen();
                if dialect.supports_aggregate_filter() {
                    match arg {
                        Some(a) => a.write_tokens(ts, dialect),
                        None => {
                            ts.push(Token::Star);
                        }
                    }
                    ts.rparen()
                        .space()
                        .push(Token::Filter)
                        .space()
                        .lparen()
                        .push(Token::Where)
                        .space();
                    filter.write_tokens(ts, dialect);
                    ts.rparen();
                } else {
                    // CASE without ELSE yields NULL, which aggregates skip
                    ts.push(Token::Case).space().push(Token::When).space();
                    filter.write_tokens(ts, dialect);
                    ts.space().push(Token::Then).space();
                    match arg {
                        Some(a) => a.write_tokens(ts, dialect),
                        None => {
                            ts.push(Token::LitInt(1));
                        }
                    }
                    ts.space().push(Token::End).rparen();
                }
            }
            Expr::Case {
                branches,
                otherwise,
            } => {
                ts.push(Token::Case);
                for (condition, value) in branches {
                    ts.space().push(Token::When).space();
                    condition.write_tokens(ts, dialect);
                    ts.space().push(Token::Then).space();
                    value.write_tokens(ts, dialect);
                }
                if let Some(e) = otherwise {
                    ts.space().push(Token::Else).space();
                    e.write_tokens(ts, dialect);
                }
                ts.space().push(Token::End);
            }
            Expr::Cast { expr, data_type } => {
                ts.push(Token::Cast).lparen();
                expr.write_tokens(ts, dialect);
                ts.space()
                    .push(Token::As)
                    .space()
                    .push(Token::TypeName(data_type.type_name()))
                    .rparen();
            }
            Expr::InList { expr, values } => {
                // "x IN ()" is not valid SQL
                if values.is_empty() {
                    ts.push(Token::False);
                    return;
                }
                expr.write_tokens(ts, dialect);
                ts.space().push(Token::In).space().lparen();
                write_list(ts, values, dialect);
                ts.rparen();
            }
            Expr::Between { expr, low, high } => {
                expr.write_tokens(ts, dialect);
                ts.space().push(Token::Between).space();
                low.write_tokens(ts, dialect);
                ts.space().push(Token::And).space();
                high.write_tokens(ts, dialect);
            }
            Expr::Star => {
                ts.push(Token::Star);
            }
            Expr::Paren(inner) => {
                ts.lparen();
                inner.write_tokens(ts, dialect);
                ts.rparen();
            }
        }
    }

    /// Render this expression as SQL text.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}

fn write_list(ts: &mut TokenStream, items: &[Expr], dialect: Dialect) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        item.write_tokens(ts, dialect);
    }
}

// =============================================================================
// Constructor Functions
// =============================================================================

pub fn col(name: &str) -> Expr {
    Expr::Column(name.into())
}

pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

pub fn lit_null() -> Expr {
    Expr::Literal(Literal::Null)
}

pub fn paren(expr: Expr) -> Expr {
    Expr::Paren(Box::new(expr))
}

fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

pub fn sum(expr: Expr) -> Expr {
    call("SUM", vec![expr])
}

pub fn count_star() -> Expr {
    call("COUNT", vec![Expr::Star])
}

pub fn count_distinct(expr: Expr) -> Expr {
    Expr::Function {
        name: "COUNT".into(),
        args: vec![expr],
        distinct: true,
    }
}

/// `COUNT(*)` over the rows matching `filter`.
pub fn count_where(filter: Expr) -> Expr {
    Expr::FilteredAggregate {
        name: "COUNT".into(),
        arg: None,
        filter: Box::new(filter),
    }
}

pub fn coalesce(exprs: Vec<Expr>) -> Expr {
    call("COALESCE", exprs)
}

pub fn lower(expr: Expr) -> Expr {
    call("LOWER", vec![expr])
}

/// Accent folding; the function name is remapped per dialect.
pub fn unaccent(expr: Expr) -> Expr {
    call("UNACCENT", vec![expr])
}

/// `DATE_TRUNC('unit', expr)`
pub fn date_trunc(unit: &str, expr: Expr) -> Expr {
    call("DATE_TRUNC", vec![Expr::Literal(Literal::Text(unit.into())), expr])
}

pub fn cast(expr: Expr, data_type: SqlType) -> Expr {
    Expr::Cast {
        expr: Box::new(expr),
        data_type,
    }
}

pub fn case_when(branches: Vec<(Expr, Expr)>, otherwise: Option<Expr>) -> Expr {
    Expr::Case {
        branches,
        otherwise: otherwise.map(Box::new),
    }
}

// =============================================================================
// Expression Builder Trait
// =============================================================================

/// Fluent operators over [`Expr`].
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binary(self, op: BinaryOperator, other: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other),
        }
    }

    fn eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    fn gte(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Gte, other)
    }

    fn lt(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Lt, other)
    }

    fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    fn sub(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Minus, other)
    }

    fn mul(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Mul, other)
    }

    fn div(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Div, other)
    }

    fn like(self, pattern: Expr) -> Expr {
        self.binary(BinaryOperator::Like, pattern)
    }

    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self.into_expr()),
            values,
        }
    }

    fn between(self, low: Expr, high: Expr) -> Expr {
        Expr::Between {
            expr: Box::new(self.into_expr()),
            low: Box::new(low),
            high: Box::new(high),
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
