use serde_json::Value;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use super::entity::{Entity, Loaded};
use super::manager::DatabaseError;
use super::query_builder::{LazyQuery, QuerySpec};
use super::unit_of_work::{StagedEntity, StagedMutation, UnitOfWork};

/// Typed access to one entity's table within a unit of work.
///
/// Reads go through `query`/`get_one`; `add`, `update` and `delete` only
/// stage changes, which reach the store on `commit`.
pub struct Repository<'u, T: Entity> {
    uow: &'u mut UnitOfWork,
    _entity: PhantomData<T>,
}

impl<'u, T: Entity> Repository<'u, T> {
    pub fn new(uow: &'u mut UnitOfWork) -> Self {
        Self {
            uow,
            _entity: PhantomData,
        }
    }

    /// Start a lazy query. `None` reads every record with tracking enabled.
    pub fn query(&mut self, spec: Option<QuerySpec>) -> LazyQuery<'_, T> {
        LazyQuery::new(self.uow, spec.unwrap_or_default())
    }

    /// First record matching `predicate`, tracked, with `includes` loaded
    pub async fn get_one(&mut self, predicate: Value, includes: &[&str]) -> Result<Option<Loaded<T>>, DatabaseError> {
        let spec = QuerySpec::new()
            .predicate(predicate)
            .includes(includes.iter().copied());
        self.query(Some(spec)).fetch_optional().await
    }

    /// Stage an insert. The store assigns the identity during commit, after
    /// which the entity is tracked by the unit of work.
    pub fn add(&mut self, entity: T) -> Result<Pending<T>, DatabaseError> {
        let slot = Arc::new(OnceLock::new());
        self.uow.stage(StagedMutation::Insert {
            table: T::TABLE,
            columns: T::COLUMNS,
            values: entity.values(),
            slot: slot.clone(),
            entity: StagedEntity::new(entity.clone()),
        })?;
        Ok(Pending { entity, slot })
    }

    /// Stage a full replace of every column of the record with this identity
    pub fn update(&mut self, entity: T) -> Result<T, DatabaseError> {
        self.uow.stage(StagedMutation::Update {
            table: T::TABLE,
            columns: T::COLUMNS,
            id: entity.id(),
            values: entity.values(),
        })?;
        self.uow.retrack(&entity);
        Ok(entity)
    }

    pub fn delete(&mut self, entity: &T) -> Result<(), DatabaseError> {
        self.uow.stage(StagedMutation::Delete {
            table: T::TABLE,
            id: entity.id(),
        })?;
        self.uow.forget::<T>(entity.id());
        Ok(())
    }

    /// Commit the whole unit of work, not only this repository's changes
    pub async fn commit(&mut self) -> Result<usize, DatabaseError> {
        self.uow.commit().await
    }
}

/// An entity staged for insert. Its identity becomes readable once the
/// unit of work commits.
#[derive(Debug, Clone)]
pub struct Pending<T> {
    entity: T,
    slot: Arc<OnceLock<i64>>,
}

impl<T: Entity> Pending<T> {
    /// Store-assigned identity, `None` until committed
    pub fn id(&self) -> Option<i64> {
        self.slot.get().copied()
    }

    pub fn staged(&self) -> &T {
        &self.entity
    }

    pub fn committed(&self) -> Option<T> {
        self.id().map(|id| {
            let mut entity = self.entity.clone();
            entity.set_id(id);
            entity
        })
    }

    pub fn into_committed(self) -> Result<T, DatabaseError> {
        let id = self.id().ok_or(DatabaseError::NotCommitted)?;
        let mut entity = self.entity;
        entity.set_id(id);
        Ok(entity)
    }
}
