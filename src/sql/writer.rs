//! SQL rendering sink.
//!
//! `SqlWriter` accumulates SQL text and the bind parameters referenced
//! by it. Everything in the `sql` module serializes into a writer; the
//! finished pair is handed to whatever database driver executes the
//! query.

use serde::{Deserialize, Serialize};

/// A bind parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Param {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

/// Accumulates SQL text plus positional bind parameters.
#[derive(Debug, Default)]
pub struct SqlWriter {
    sql: String,
    params: Vec<Param>,
}

impl SqlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw SQL text. Only ever called with static fragments
    /// produced by the AST serializers.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a quoted identifier.
    pub fn ident(&mut self, name: &str) -> &mut Self {
        self.sql.push('"');
        for ch in name.chars() {
            if ch == '"' {
                self.sql.push('"');
            }
            self.sql.push(ch);
        }
        self.sql.push('"');
        self
    }

    /// Append a (possibly table-qualified) column reference.
    pub fn column(&mut self, table: Option<&str>, column: &str) -> &mut Self {
        if let Some(table) = table {
            self.ident(table);
            self.sql.push('.');
        }
        self.ident(column)
    }

    /// Append a `?` placeholder and record its value.
    pub fn param(&mut self, value: Param) -> &mut Self {
        self.sql.push('?');
        self.params.push(value);
        self
    }

    pub fn finish(self) -> (String, Vec<Param>) {
        (self.sql, self.params)
    }
}
