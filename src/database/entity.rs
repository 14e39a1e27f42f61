use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::any::AnyRow;
use sqlx::FromRow;
use std::ops::Deref;

use super::value::SqlValue;

/// Identity of a record that has not been written yet.
pub const UNASSIGNED_ID: i64 = 0;

/// A persisted record stored in exactly one table.
///
/// The identity column is always named `id` and is assigned by the store on
/// insert. `COLUMNS` lists every other column in the order `values` returns
/// them; updates write all of them (full replace).
pub trait Entity: for<'r> FromRow<'r, AnyRow> + Clone + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    fn values(&self) -> Vec<SqlValue>;

    /// Relations that may be named in include paths
    fn relations() -> Vec<Relation> {
        Vec::new()
    }

    fn relation(name: &str) -> Option<Relation> {
        Self::relations().into_iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Parent row holds `local_key` pointing at the related row's `id`
    BelongsTo { local_key: &'static str },
    /// Related rows hold `foreign_key` pointing at the parent's `id`
    HasMany { foreign_key: &'static str },
}

/// Eager-load metadata for one named relation of an entity.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: &'static str,
    pub table: &'static str,
    pub kind: RelationKind,
    nested: fn() -> Vec<Relation>,
}

impl Relation {
    pub fn belongs_to<E: Entity>(name: &'static str, local_key: &'static str) -> Self {
        Self {
            name,
            table: E::TABLE,
            kind: RelationKind::BelongsTo { local_key },
            nested: E::relations,
        }
    }

    pub fn has_many<E: Entity>(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            table: E::TABLE,
            kind: RelationKind::HasMany { foreign_key },
            nested: E::relations,
        }
    }

    /// Relations of the target entity, used to resolve nested include paths
    pub fn target_relations(&self) -> Vec<Relation> {
        (self.nested)()
    }
}

/// An entity returned from a query together with the related data requested
/// through include paths, keyed by the first segment of each path.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    entity: T,
    related: Map<String, Value>,
}

impl<T> Loaded<T> {
    pub fn new(entity: T) -> Self {
        Self {
            entity,
            related: Map::new(),
        }
    }

    pub(crate) fn with_related(entity: T, related: Map<String, Value>) -> Self {
        Self { entity, related }
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }

    pub fn into_inner(self) -> T {
        self.entity
    }

    /// Raw JSON of an included relation. `None` when it was not requested.
    pub fn related_value(&self, name: &str) -> Option<&Value> {
        self.related.get(name)
    }

    /// A `belongs_to` relation decoded into `R`. Missing, null or not
    /// requested relations yield `Ok(None)`.
    pub fn related<R: DeserializeOwned>(&self, name: &str) -> Result<Option<R>, serde_json::Error> {
        match self.related.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some),
        }
    }

    /// A `has_many` relation decoded into `Vec<R>`
    pub fn related_many<R: DeserializeOwned>(&self, name: &str) -> Result<Vec<R>, serde_json::Error> {
        match self.related.get(name) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(v) => serde_json::from_value(v.clone()),
        }
    }
}

impl<T> Deref for Loaded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entity
    }
}
