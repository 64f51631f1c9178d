//! The handoff between the feed query compiler and the store.
//!
//! Feed queries are compiled once per request into a SQL string plus a
//! positional argument vector. The store binds the arguments in order and
//! never inspects the SQL.

/// A positional SQL argument.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    TextArray(Vec<String>),
    Int(i64),
    Float(f64),
}

/// A compiled, parameterized feed query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<QueryValue>,
}

impl BuiltQuery {
    /// Append an argument and return its `$n` placeholder.
    pub fn push(&mut self, value: QueryValue) -> String {
        self.args.push(value);
        format!("${}", self.args.len())
    }
}
