//! Rewrites query fields that reference other tables by a human-readable name.

use crate::core::mapper::PayloadMapper;
use crate::core::query::{self, AndQuery, Query};
use crate::core::table::{self, TableClient};
use crate::utils::error::Result;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Only the field name changes.
    Rename,
    /// `sys_user` by `user_name`.
    User,
    /// `sys_user_group` by `name`.
    AssignmentGroup,
    /// `std_change_producer_version` by `name`.
    StandardChangeTemplate,
}

/// `(query field, field sent to ServiceNow, how the value is resolved)`
pub const REMAP_TABLE: &[(&str, &str, Lookup)] = &[
    ("type", "chg_model", Lookup::Rename),
    ("hold_reason", "on_hold_reason", Lookup::Rename),
    ("requested_by", "requested_by", Lookup::User),
    ("assignment_group", "assignment_group", Lookup::AssignmentGroup),
    ("template", "std_change_producer_version", Lookup::StandardChangeTemplate),
];

pub fn remap_rule(field: &str) -> Option<(&'static str, Lookup)> {
    REMAP_TABLE
        .iter()
        .find(|(name, _, _)| *name == field)
        .map(|(_, target, lookup)| (*target, *lookup))
}

async fn resolve(table_client: &TableClient, lookup: Lookup, value: &str) -> Result<String> {
    let record = match lookup {
        Lookup::Rename => return Ok(value.to_string()),
        Lookup::User => table::find_user(table_client, value).await?,
        Lookup::AssignmentGroup => table::find_assignment_group(table_client, value).await?,
        Lookup::StandardChangeTemplate => {
            table::find_standard_change_template(table_client, value).await?
        }
    };
    Ok(table::sys_id(&record)?.to_string())
}

pub async fn remap_params(query: Query, table_client: &TableClient) -> Result<Query> {
    let mut remapped = Query::with_capacity(query.len());

    for group in query {
        let mut and_query = AndQuery::with_capacity(group.len());
        for (field, mut condition) in group {
            match remap_rule(&field) {
                Some((target, lookup)) => {
                    // unary operators carry no value to resolve
                    if !condition.is_unary() {
                        condition.value = resolve(table_client, lookup, &condition.value).await?;
                    }
                    tracing::debug!("Remapped query field {} -> {}", field, target);
                    and_query.push((target.to_string(), condition));
                }
                None => and_query.push((field, condition)),
            }
        }
        remapped.push(and_query);
    }

    Ok(remapped)
}

/// Full pipeline for the `query` parameter: parse, remap, map labels, serialize.
pub async fn sysparm_query(
    raw: &[Map<String, Value>],
    table_client: &TableClient,
    mapper: &PayloadMapper,
) -> Result<String> {
    let parsed = query::parse_query(raw)?;
    let remapped = remap_params(parsed, table_client).await?;
    Ok(query::serialize_query(&query::map_query_values(
        remapped, mapper,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_rules() {
        assert_eq!(remap_rule("type"), Some(("chg_model", Lookup::Rename)));
        assert_eq!(remap_rule("hold_reason"), Some(("on_hold_reason", Lookup::Rename)));
        assert_eq!(remap_rule("requested_by"), Some(("requested_by", Lookup::User)));
        assert_eq!(
            remap_rule("template"),
            Some(("std_change_producer_version", Lookup::StandardChangeTemplate))
        );
        assert_eq!(remap_rule("assigned_to"), None);
    }
}
