//! Declarative shape checks for the raw config document.
//!
//! The document is checked before it is deserialized so that an operator gets
//! one precise message about the first bad key instead of a serde error.

use serde_yaml::{Mapping, Value};
use tracing::error;

use crate::error::SchemaViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Number,
}

impl ValueType {
    fn name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Number => value.is_number(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub ty: ValueType,
    pub length: Option<usize>,
    pub prefix: Option<&'static str>,
}

impl Rule {
    pub fn string() -> Self {
        Self {
            ty: ValueType::String,
            length: None,
            prefix: None,
        }
    }

    pub fn number() -> Self {
        Self {
            ty: ValueType::Number,
            length: None,
            prefix: None,
        }
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = Some(prefix);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Schema {
    Leaf(Rule),
    Record(Vec<Entry>),
}

#[derive(Debug, Clone)]
pub enum Entry {
    Field(&'static str, Schema),
    /// Variant key to sub-schema. Only the active variant is looked up.
    Choice(Vec<(&'static str, Schema)>),
}

/// Checks `value` against `schema`, stopping at the first violation.
pub fn check(value: &Value, schema: &Schema, active: &str) -> Result<(), SchemaViolation> {
    check_at(value, schema, active, "")
}

/// Like [`check`], but logs the violation and reports a plain pass/fail.
pub fn validate(value: &Value, schema: &Schema, active: &str) -> bool {
    match check(value, schema, active) {
        Ok(()) => true,
        Err(violation) => {
            error!("ERROR, invalid config parameters, {}", violation);
            false
        }
    }
}

fn check_at(
    value: &Value,
    schema: &Schema,
    active: &str,
    key: &str,
) -> Result<(), SchemaViolation> {
    match schema {
        Schema::Leaf(rule) => check_leaf(value, rule, key),
        Schema::Record(entries) => {
            let empty = Mapping::new();
            let map = value.as_mapping().unwrap_or(&empty);
            for entry in entries {
                match entry {
                    Entry::Field(name, sub) => {
                        let path = join(key, name);
                        let field = map
                            .get(*name)
                            .ok_or_else(|| SchemaViolation::Missing { key: path.clone() })?;
                        check_at(field, sub, active, &path)?;
                    }
                    Entry::Choice(variants) => {
                        let Some((name, sub)) = variants.iter().find(|(name, _)| *name == active)
                        else {
                            continue;
                        };
                        let path = join(key, name);
                        let field = map
                            .get(*name)
                            .ok_or_else(|| SchemaViolation::Missing { key: path.clone() })?;
                        check_at(field, sub, active, &path)?;
                    }
                }
            }
            Ok(())
        }
    }
}

fn check_leaf(value: &Value, rule: &Rule, key: &str) -> Result<(), SchemaViolation> {
    if !rule.ty.matches(value) {
        return Err(SchemaViolation::WrongType {
            key: key.to_string(),
            expected: rule.ty.name(),
        });
    }
    if let Some(expected) = rule.length {
        if value.as_str().map(|s| s.chars().count()) != Some(expected) {
            return Err(SchemaViolation::WrongLength {
                key: key.to_string(),
                expected,
            });
        }
    }
    if let Some(prefix) = rule.prefix {
        if !value.as_str().is_some_and(|s| s.starts_with(prefix)) {
            return Err(SchemaViolation::WrongPrefix {
                key: key.to_string(),
                expected: prefix.to_string(),
            });
        }
    }
    Ok(())
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
