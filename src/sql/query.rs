//! SELECT statement builder.

use super::dialect::{Dialect, SqlDialect};
use super::expr::{Expr, ExprExt, SortDir};
use super::token::{Token, TokenStream};

// =============================================================================
// Select list item
// =============================================================================

/// A SELECT list item with an optional output alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn write_tokens(&self, ts: &mut TokenStream, dialect: Dialect) {
        ts.append(&self.expr.to_tokens(dialect));
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

// =============================================================================
// Source relation
// =============================================================================

/// The FROM relation: a table, optionally schema-qualified, or a CTE name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.into(),
        }
    }

    /// Parse `schema.table` or `table`.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once('.') {
            Some((schema, table)) => Self {
                schema: Some(schema.into()),
                table: table.into(),
            },
            None => Self::new(qualified),
        }
    }

    fn token(&self) -> Token {
        Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        }
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct OrderByExpr {
    pub expr: Expr,
    pub dir: SortDir,
}

impl OrderByExpr {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Asc,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Desc,
        }
    }

    fn write_tokens(&self, ts: &mut TokenStream, dialect: Dialect) {
        ts.append(&self.expr.to_tokens(dialect)).space().push(match self.dir {
            SortDir::Asc => Token::Asc,
            SortDir::Desc => Token::Desc,
        });
    }
}

// =============================================================================
// CTE
// =============================================================================

/// A named subquery in the WITH clause.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct Cte {
    pub name: String,
    pub query: Box<Query>,
}

impl Cte {
    pub fn new(name: &str, query: Query) -> Self {
        Self {
            name: name.into(),
            query: Box::new(query),
        }
    }

    fn write_tokens(&self, ts: &mut TokenStream, dialect: Dialect) {
        ts.push(Token::Ident(self.name.clone()))
            .space()
            .push(Token::As)
            .space()
            .lparen()
            .newline()
            .append(&self.query.to_tokens(dialect))
            .newline()
            .rparen();
    }
}

// =============================================================================
// Query Builder
// =============================================================================

/// A SELECT statement.
///
/// The row cap is an expression so it can travel as a bind parameter; there
/// is no OFFSET, result sets are capped and never paged.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until converted to SQL with to_sql() or to_tokens()"]
pub struct Query {
    pub with: Vec<Cte>,
    pub select: Vec<SelectExpr>,
    pub distinct: bool,
    pub from: Option<TableRef>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Expr>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cte(mut self, cte: Cte) -> Self {
        self.with.push(cte);
        self
    }

    pub fn select(mut self, exprs: Vec<impl Into<SelectExpr>>) -> Self {
        self.select = exprs.into_iter().map(Into::into).collect();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn from(mut self, table: TableRef) -> Self {
        self.from = Some(table);
        self
    }

    /// Add a WHERE condition, ANDed with any existing one.
    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = Some(conjoin(self.where_clause.take(), condition));
        self
    }

    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by = exprs;
        self
    }

    /// Add a HAVING condition, ANDed with any existing one.
    pub fn having(mut self, condition: Expr) -> Self {
        self.having = Some(conjoin(self.having.take(), condition));
        self
    }

    pub fn order_by(mut self, exprs: Vec<OrderByExpr>) -> Self {
        self.order_by = exprs;
        self
    }

    pub fn limit(mut self, limit: Expr) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Convert to token stream for a specific dialect.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        if !self.with.is_empty() {
            ts.push(Token::With).space();
            for (i, cte) in self.with.iter().enumerate() {
                if i > 0 {
                    ts.comma().newline();
                }
                cte.write_tokens(&mut ts, dialect);
            }
            ts.newline();
        }

        ts.push(Token::Select);
        if self.distinct {
            ts.space().push(Token::Distinct);
        }
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                ts.comma();
            }
            ts.newline().indent(1);
            item.write_tokens(&mut ts, dialect);
        }

        if let Some(from) = &self.from {
            ts.newline().push(Token::From).space().push(from.token());
        }

        if let Some(condition) = &self.where_clause {
            ts.newline()
                .push(Token::Where)
                .space()
                .append(&condition.to_tokens(dialect));
        }

        if !self.group_by.is_empty() {
            ts.newline().push(Token::GroupBy).space();
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&expr.to_tokens(dialect));
            }
        }

        if let Some(condition) = &self.having {
            ts.newline()
                .push(Token::Having)
                .space()
                .append(&condition.to_tokens(dialect));
        }

        if !self.order_by.is_empty() {
            ts.newline().push(Token::OrderBy).space();
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                item.write_tokens(&mut ts, dialect);
            }
        }

        if let Some(limit) = &self.limit {
            ts.newline()
                .append(&dialect.emit_limit(&limit.to_tokens(dialect)));
        }

        ts
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}

fn conjoin(existing: Option<Expr>, condition: Expr) -> Expr {
    match existing {
        Some(e) => e.and(condition),
        None => condition,
    }
}

impl std::fmt::Display for Query {
    /// Formats the query using the default dialect (PostgreSQL).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql(Dialect::default()))
    }
}

// =============================================================================
// Tests
// =============================================================================
