//! Ansible-style queries (`[{field: "OP value"}]`) and their ServiceNow encoded form.

use crate::core::mapper::PayloadMapper;
use crate::utils::error::{Result, SnowError};
use serde_json::Value;

pub const UNARY_OPERATORS: &[&str] = &["ISEMPTY", "ISNOTEMPTY", "ANYTHING", "EMPTYSTRING"];

pub const BINARY_OPERATORS: &[&str] = &[
    "=",
    "!=",
    ">",
    ">=",
    "<",
    "<=",
    "STARTSWITH",
    "ENDSWITH",
    "LIKE",
    "NOT LIKE",
    "IN",
    "NOT IN",
    "SAMEAS",
    "NSAMEAS",
    "BETWEEN",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub operator: String,
    pub value: String,
}

impl Condition {
    pub fn new(operator: &str, value: &str) -> Self {
        Self {
            operator: operator.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_unary(&self) -> bool {
        UNARY_OPERATORS.contains(&self.operator.as_str())
    }

    fn is_list(&self) -> bool {
        matches!(self.operator.as_str(), "IN" | "NOT IN")
    }
}

/// Conditions joined with AND.
pub type AndQuery = Vec<(String, Condition)>;

/// AND groups joined with OR.
pub type Query = Vec<AndQuery>;

fn split_operator(expression: &str) -> Option<(&'static str, &str)> {
    let expression = expression.trim();
    UNARY_OPERATORS
        .iter()
        .chain(BINARY_OPERATORS.iter())
        .filter(|op| {
            expression
                .strip_prefix(**op)
                .map(|rest| {
                    rest.is_empty() || rest.starts_with(char::is_whitespace) || !is_word(op)
                })
                .unwrap_or(false)
        })
        .max_by_key(|op| op.len())
        .map(|op| (*op, expression[op.len()..].trim()))
}

fn is_word(op: &str) -> bool {
    op.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
}

fn parse_condition(field: &str, raw: &Value) -> std::result::Result<Condition, String> {
    let expression = match raw {
        Value::String(s) => s.as_str(),
        other => {
            return Err(format!(
                "Value of '{}' must be a string expression, got {}",
                field, other
            ))
        }
    };

    let (operator, value) = split_operator(expression)
        .ok_or_else(|| format!("Invalid condition '{}' for column '{}'.", expression, field))?;

    let is_unary = UNARY_OPERATORS.contains(&operator);
    if is_unary && !value.is_empty() {
        return Err(format!(
            "Operator {} does not take any arguments, but got '{}' for column '{}'.",
            operator, value, field
        ));
    }
    if !is_unary && value.is_empty() {
        return Err(format!(
            "Operator {} requires an argument for column '{}'.",
            operator, field
        ));
    }

    Ok(Condition::new(operator, value))
}

/// Parses the `query` module parameter, reporting every invalid condition at once.
pub fn parse_query(raw: &[serde_json::Map<String, Value>]) -> Result<Query> {
    let mut parsed = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();

    for group in raw {
        let mut and_query = AndQuery::with_capacity(group.len());
        for (field, expression) in group {
            match parse_condition(field, expression) {
                Ok(condition) => and_query.push((field.clone(), condition)),
                Err(message) => errors.push(message),
            }
        }
        parsed.push(and_query);
    }

    if errors.is_empty() {
        Ok(parsed)
    } else {
        Err(SnowError::QueryError {
            message: errors.join(" "),
        })
    }
}

/// Replaces Ansible labels with ServiceNow codes on mapped fields.
pub fn map_query_values(query: Query, mapper: &PayloadMapper) -> Query {
    query
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .map(|(field, mut condition)| {
                    if mapper.maps(&field) && !condition.is_unary() {
                        condition.value = if condition.is_list() {
                            condition
                                .value
                                .split(',')
                                .map(|item| mapper.snow_value(&field, item.trim()))
                                .collect::<Vec<_>>()
                                .join(",")
                        } else {
                            mapper.snow_value(&field, &condition.value)
                        };
                    }
                    (field, condition)
                })
                .collect()
        })
        .collect()
}

pub fn serialize_query(query: &Query) -> String {
    query
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|(field, condition)| {
                    format!("{}{}{}", field, condition.operator, condition.value)
                })
                .collect::<Vec<_>>()
                .join("^")
        })
        .collect::<Vec<_>>()
        .join("^NQ")
}
