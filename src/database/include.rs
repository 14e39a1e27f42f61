use serde_json::{Map, Number, Value};
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Column, Row};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::entity::{Relation, RelationKind};
use super::manager::DatabaseError;
use super::value::{placeholders, quote_identifier};

/// Decode a row into a JSON object without knowing the column types up front
pub(crate) fn row_to_json(row: &AnyRow) -> Map<String, Value> {
    let mut map = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            v.map(Value::from).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            v.and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            v.map(Value::String).unwrap_or(Value::Null)
        } else {
            Value::Null
        };
        map.insert(column.name().to_string(), value);
    }
    map
}

/// Check every include path against the relation graph before touching the store
pub(crate) fn validate_paths(relations: &[Relation], includes: &[String]) -> Result<(), DatabaseError> {
    for path in includes {
        let mut current = relations.to_vec();
        for segment in path.split('.') {
            let relation = current
                .iter()
                .find(|r| r.name == segment)
                .ok_or_else(|| DatabaseError::UnknownInclude(path.clone()))?;
            current = relation.target_relations();
        }
    }
    Ok(())
}

/// Rows of `table` whose `column` is one of `keys`, in identity order
pub(crate) async fn fetch_by_column(
    pool: &AnyPool,
    table: &str,
    column: &str,
    keys: &[i64],
) -> Result<Vec<Map<String, Value>>, DatabaseError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT * FROM {} WHERE {} IN ({}) ORDER BY \"id\" ASC",
        quote_identifier(table),
        quote_identifier(column),
        placeholders(keys.len(), 0)
    );
    debug!("SQL: {}", sql);
    let mut query = sqlx::query(&sql);
    for key in keys {
        query = query.bind(*key);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

/// Attach related rows to `roots` for every include path. Each level is one
/// batched query; relations already attached by an earlier path are reused.
pub(crate) async fn load_includes(
    pool: &AnyPool,
    roots: &mut [Map<String, Value>],
    relations: &[Relation],
    includes: &[String],
) -> Result<(), DatabaseError> {
    for path in includes {
        let mut current = relations.to_vec();
        let mut parents: Vec<&mut Map<String, Value>> = roots.iter_mut().collect();

        for segment in path.split('.') {
            let relation = current
                .iter()
                .find(|r| r.name == segment)
                .cloned()
                .ok_or_else(|| DatabaseError::UnknownInclude(path.clone()))?;

            load_relation(pool, &mut parents, &relation).await?;

            let mut next = Vec::new();
            for parent in parents {
                match parent.get_mut(relation.name) {
                    Some(Value::Object(child)) => next.push(child),
                    Some(Value::Array(children)) => {
                        for child in children.iter_mut() {
                            if let Value::Object(child) = child {
                                next.push(child);
                            }
                        }
                    }
                    _ => {}
                }
            }
            parents = next;
            current = relation.target_relations();
        }
    }
    Ok(())
}

async fn load_relation(
    pool: &AnyPool,
    parents: &mut [&mut Map<String, Value>],
    relation: &Relation,
) -> Result<(), DatabaseError> {
    let pending: Vec<usize> = parents
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.contains_key(relation.name))
        .map(|(i, _)| i)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    match relation.kind {
        RelationKind::BelongsTo { local_key } => {
            let keys = unique_keys(pending.iter().map(|&i| &*parents[i]), local_key);
            let rows = fetch_by_column(pool, relation.table, "id", &keys).await?;
            let by_id: HashMap<i64, Map<String, Value>> = rows
                .into_iter()
                .filter_map(|row| row.get("id").and_then(Value::as_i64).map(|id| (id, row)))
                .collect();
            for i in pending {
                let parent = &mut *parents[i];
                let related = parent
                    .get(local_key)
                    .and_then(Value::as_i64)
                    .and_then(|key| by_id.get(&key).cloned())
                    .map(Value::Object)
                    .unwrap_or(Value::Null);
                parent.insert(relation.name.to_string(), related);
            }
        }
        RelationKind::HasMany { foreign_key } => {
            let keys = unique_keys(pending.iter().map(|&i| &*parents[i]), "id");
            let rows = fetch_by_column(pool, relation.table, foreign_key, &keys).await?;
            let mut grouped: HashMap<i64, Vec<Value>> = HashMap::new();
            for row in rows {
                if let Some(key) = row.get(foreign_key).and_then(Value::as_i64) {
                    grouped.entry(key).or_default().push(Value::Object(row));
                }
            }
            for i in pending {
                let parent = &mut *parents[i];
                let children = parent
                    .get("id")
                    .and_then(Value::as_i64)
                    .and_then(|id| grouped.get(&id).cloned())
                    .unwrap_or_default();
                parent.insert(relation.name.to_string(), Value::Array(children));
            }
        }
    }
    Ok(())
}

fn unique_keys<'a>(maps: impl Iterator<Item = &'a Map<String, Value>>, key: &str) -> Vec<i64> {
    let mut seen = HashSet::new();
    maps.filter_map(|m| m.get(key).and_then(Value::as_i64))
        .filter(|k| seen.insert(*k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Course, Quiz};
    use crate::database::entity::Entity;

    #[test]
    fn validates_nested_paths() {
        let relations = Quiz::relations();
        assert!(validate_paths(&relations, &["content.assets.file".to_string()]).is_ok());
        assert!(validate_paths(&relations, &["answers".to_string()]).is_ok());
        assert!(matches!(
            validate_paths(&relations, &["content.nope".to_string()]),
            Err(DatabaseError::UnknownInclude(p)) if p == "content.nope"
        ));
        assert!(validate_paths(&Course::relations(), &["author.image".to_string()]).is_ok());
    }

    #[test]
    fn keys_are_deduplicated_in_order() {
        let a: Map<String, Value> = serde_json::from_value(serde_json::json!({ "k": 2 })).unwrap();
        let b: Map<String, Value> = serde_json::from_value(serde_json::json!({ "k": 1 })).unwrap();
        let c: Map<String, Value> = serde_json::from_value(serde_json::json!({ "k": 2 })).unwrap();
        let d: Map<String, Value> = serde_json::from_value(serde_json::json!({ "k": null })).unwrap();
        assert_eq!(unique_keys([&a, &b, &c, &d].into_iter(), "k"), vec![2, 1]);
    }
}
