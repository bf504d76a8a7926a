//! Document filters, sort keys and grouping pipelines, and their SQL form
//! over JSON documents stored in a `doc` column.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: &'static str,
    pub order: SortOrder,
}

impl SortKey {
    pub fn asc(field: &'static str) -> Self {
        Self { field, order: SortOrder::Asc }
    }

    pub fn desc(field: &'static str) -> Self {
        Self { field, order: SortOrder::Desc }
    }
}

/// Predicate over stored documents.
///
/// Field names are compile-time constants and are written into SQL as
/// JSON paths; all values travel as bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(&'static str, Value),
    Gt(&'static str, Value),
    In(&'static str, Vec<Value>),
    /// Unanchored regular-expression match against a string field
    Regex(&'static str, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self::Eq(field, value.into())
    }

    pub fn gt(field: &'static str, value: impl Into<Value>) -> Self {
        Self::Gt(field, value.into())
    }

    pub fn is_in<V: Into<Value>>(field: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(field, values.into_iter().map(Into::into).collect())
    }

    pub fn regex(field: &'static str, pattern: impl Into<String>) -> Self {
        Self::Regex(field, pattern.into())
    }

    /// Any of `fields` equals `value`
    pub fn any_eq(fields: &[&'static str], value: &str) -> Self {
        Self::Or(fields.iter().map(|f| Self::eq(*f, value)).collect())
    }

    /// Any of `fields` matches `pattern`
    pub fn any_regex(fields: &[&'static str], pattern: &str) -> Self {
        Self::Or(fields.iter().map(|f| Self::regex(*f, pattern)).collect())
    }

    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Self::All, other) => other,
            (this, Self::All) => this,
            (Self::And(mut parts), other) => {
                parts.push(other);
                Self::And(parts)
            }
            (this, other) => Self::And(vec![this, other]),
        }
    }

    pub(crate) fn write_sql(&self, sql: &mut String, binds: &mut Vec<Bind>) {
        match self {
            Self::All => sql.push_str("1 = 1"),
            Self::Eq(field, value) => {
                if value.is_null() {
                    sql.push_str(&format!("{} IS NULL", json_path(field)));
                } else {
                    sql.push_str(&format!("{} = ?", json_path(field)));
                    binds.push(Bind::from(value));
                }
            }
            Self::Gt(field, value) => {
                sql.push_str(&format!("{} > ?", json_path(field)));
                binds.push(Bind::from(value));
            }
            Self::In(field, values) => {
                if values.is_empty() {
                    sql.push_str("0 = 1");
                    return;
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!("{} IN ({})", json_path(field), placeholders));
                binds.extend(values.iter().map(Bind::from));
            }
            Self::Regex(field, pattern) => {
                sql.push_str(&format!("{} REGEXP ?", json_path(field)));
                binds.push(Bind::Text(pattern.clone()));
            }
            Self::And(parts) => write_joined(parts, " AND ", "1 = 1", sql, binds),
            Self::Or(parts) => write_joined(parts, " OR ", "0 = 1", sql, binds),
        }
    }
}

fn write_joined(parts: &[Filter], separator: &str, empty: &str, sql: &mut String, binds: &mut Vec<Bind>) {
    if parts.is_empty() {
        sql.push_str(empty);
        return;
    }
    sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push_str(separator);
        }
        part.write_sql(sql, binds);
    }
    sql.push(')');
}

pub(crate) fn json_path(field: &str) -> String {
    format!("json_extract(doc, '$.{}')", field)
}

/// A value bound to a SQL placeholder
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Bind {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl From<&Value> for Bind {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Bind::Null,
            Value::Bool(b) => Bind::Int(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Bind::Int(i),
                None => Bind::Real(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Bind::Text(s.clone()),
            other => Bind::Text(other.to_string()),
        }
    }
}

/// Grouping key of an aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    /// Value of a string field
    Field(&'static str),
    /// UTC calendar day (`YYYY-MM-DD`) of a unix-seconds field
    Day(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    /// Floating-point sum of a numeric field
    Sum(&'static str),
    /// Number of documents in the group
    Count,
    /// Smallest integer value of a field
    Min(&'static str),
}

/// `match -> group -> sort -> limit`, yielding one document per group:
/// `{"_id": key, <name>: accumulated, ...}`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub filter: Filter,
    pub group: GroupBy,
    pub accumulators: Vec<(&'static str, Accumulator)>,
    pub sort: Option<SortKey>,
    pub limit: Option<u64>,
}

impl Pipeline {
    pub fn group(filter: Filter, group: GroupBy) -> Self {
        Self {
            filter,
            group,
            accumulators: Vec::new(),
            sort: None,
            limit: None,
        }
    }

    pub fn accumulate(mut self, name: &'static str, accumulator: Accumulator) -> Self {
        self.accumulators.push((name, accumulator));
        self
    }

    /// Sort on an accumulator name
    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort = Some(key);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
