//! Field Registry: the column whitelist and its alias table.
//!
//! The whitelist is the only thing standing between a caller-supplied name
//! and SQL text. Every identifier the compiler emits for a request must pass
//! [`FieldRegistry::is_allowed`] first.

use std::collections::HashMap;

use serde::Serialize;

/// How a column's values are bound as parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
}

/// A whitelisted column of the order-item table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub kind: FieldKind,
}

const FIELDS: &[(&str, FieldKind)] = &[
    ("emissao", FieldKind::Date),
    ("pedido", FieldKind::Text),
    ("nota_fiscal", FieldKind::Integer),
    ("cliente", FieldKind::Text),
    ("vendedor", FieldKind::Text),
    ("uf", FieldKind::Text),
    ("cidade", FieldKind::Text),
    ("produto", FieldKind::Text),
    ("marca", FieldKind::Text),
    ("categoria", FieldKind::Text),
    ("quantidade", FieldKind::Decimal),
    ("preco_unitario", FieldKind::Decimal),
    ("preco_cheio", FieldKind::Decimal),
    ("custo_reposicao", FieldKind::Decimal),
    ("faturamento", FieldKind::Decimal),
    ("cmv", FieldKind::Decimal),
    ("mc", FieldKind::Decimal),
];

const FIELD_ALIASES: &[(&str, &str)] = &[
    ("nota", "nota_fiscal"),
    ("nf", "nota_fiscal"),
    ("data", "emissao"),
    ("data_emissao", "emissao"),
    ("estado", "uf"),
    ("qtde", "quantidade"),
    ("qtd", "quantidade"),
    ("receita", "faturamento"),
    ("margem", "mc"),
    ("custo", "cmv"),
    ("sku", "produto"),
    ("representante", "vendedor"),
];

/// Immutable whitelist of columns plus single-hop aliases.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: HashMap<&'static str, FieldDefinition>,
    aliases: HashMap<&'static str, &'static str>,
}

impl FieldRegistry {
    /// The order-item table's columns.
    pub fn standard() -> Self {
        let fields = FIELDS
            .iter()
            .map(|&(name, kind)| (name, FieldDefinition { name, kind }))
            .collect();
        let aliases = FIELD_ALIASES.iter().copied().collect();
        Self { fields, aliases }
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Canonical name for `name`; identity when no alias exists.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).copied().unwrap_or(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn kind(&self, name: &str) -> Option<FieldKind> {
        self.get(name).map(|f| f.kind)
    }

    /// All fields, sorted by name.
    pub fn fields(&self) -> Vec<&FieldDefinition> {
        let mut all: Vec<_> = self.fields.values().collect();
        all.sort_by_key(|f| f.name);
        all
    }

    /// All `(alias, canonical)` pairs, sorted by alias.
    pub fn aliases(&self) -> Vec<(&'static str, &'static str)> {
        let mut all: Vec<_> = self.aliases.iter().map(|(a, c)| (*a, *c)).collect();
        all.sort();
        all
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
