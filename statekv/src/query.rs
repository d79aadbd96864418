//! Rich queries over JSON values.
//!
//! A [`QueryEngine`] turns an opaque query string into an ordered stream of
//! state entries. [`SelectorQueryEngine`] is the default engine. It accepts
//! a selector document:
//!
//! ```json
//! {"selector": {"docType": "answer", "owner.id": {"$eq": "U"}}, "limit": 10}
//! ```
//!
//! and returns every plain entry whose value is a JSON document with equal
//! fields. Dotted names address nested fields.

use async_trait::async_trait;
use common::{Record, RecordsIterator, StorageRead};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::serde::plain_key_range;
use crate::storage::StateIterator;

/// Executes rich queries against a read view of the store.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Runs `query` and returns the matching entries in key order.
    ///
    /// An invalid query fails with [`Error::Query`], whose message is
    /// reported to the caller unchanged.
    async fn execute(&self, storage: &dyn StorageRead, query: &str) -> Result<StateIterator>;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SelectorQuery {
    selector: Map<String, Value>,
    #[serde(default)]
    limit: Option<usize>,
}

/// Field equality matcher over JSON values.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectorQueryEngine;

impl SelectorQueryEngine {
    pub fn new() -> Self {
        Self
    }

    fn parse(query: &str) -> Result<(Vec<(Vec<String>, Value)>, Option<usize>)> {
        let parsed: SelectorQuery = serde_json::from_str(query)
            .map_err(|e| Error::Query(format!("invalid query: {}", e)))?;

        let mut conditions = Vec::with_capacity(parsed.selector.len());
        for (field, condition) in parsed.selector {
            let path = field.split('.').map(str::to_string).collect();
            conditions.push((path, Self::expected_value(&field, condition)?));
        }
        Ok((conditions, parsed.limit))
    }

    /// Unwraps `{"$eq": v}` and rejects every other operator.
    fn expected_value(field: &str, condition: Value) -> Result<Value> {
        let Value::Object(map) = &condition else {
            return Ok(condition);
        };
        if !map.keys().any(|k| k.starts_with('$')) {
            return Ok(condition);
        }
        if map.len() != 1 {
            return Err(Error::Query(format!(
                "field '{}' mixes operators with other members",
                field
            )));
        }
        match map.get("$eq") {
            Some(expected) => Ok(expected.clone()),
            None => {
                let operator = map.keys().next().cloned().unwrap_or_default();
                Err(Error::Query(format!(
                    "unsupported operator '{}' on field '{}'",
                    operator, field
                )))
            }
        }
    }

    fn matches(document: &Value, conditions: &[(Vec<String>, Value)]) -> bool {
        conditions.iter().all(|(path, expected)| {
            let mut current = document;
            for segment in path {
                match current.get(segment) {
                    Some(next) => current = next,
                    None => return false,
                }
            }
            current == expected
        })
    }
}

#[async_trait]
impl QueryEngine for SelectorQueryEngine {
    async fn execute(&self, storage: &dyn StorageRead, query: &str) -> Result<StateIterator> {
        let (conditions, limit) = Self::parse(query)?;
        let limit = limit.unwrap_or(usize::MAX);

        let mut iter = storage.scan_iter(plain_key_range("", "")?).await?;
        let mut matched: Vec<Record> = Vec::new();
        while matched.len() < limit {
            let Some(record) = iter.next().await? else {
                break;
            };
            let Ok(document) = serde_json::from_slice::<Value>(&record.value) else {
                continue;
            };
            if Self::matches(&document, &conditions) {
                matched.push(record);
            }
        }
        tracing::debug!(matched = matched.len(), "selector query complete");
        Ok(StateIterator::new(Box::new(RecordsIterator::new(matched))))
    }
}
