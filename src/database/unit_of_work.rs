use sqlx::{AnyPool, Row};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

use super::entity::Entity;
use super::manager::DatabaseError;
use super::repository::Repository;
use super::value::{bind_all, placeholders, quote_identifier, SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    /// Nothing staged
    Idle,
    /// At least one mutation is waiting for commit
    Dirty,
    /// A commit failed; every further operation is rejected
    Failed,
}

#[derive(Debug)]
pub(crate) enum StagedMutation {
    Insert {
        table: &'static str,
        columns: &'static [&'static str],
        values: Vec<SqlValue>,
        slot: Arc<OnceLock<i64>>,
        entity: StagedEntity,
    },
    Update {
        table: &'static str,
        columns: &'static [&'static str],
        id: i64,
        values: Vec<SqlValue>,
    },
    Delete {
        table: &'static str,
        id: i64,
    },
}

type IdentityKey = (&'static str, i64);
type Tracked = Box<dyn Any + Send + Sync>;

/// A staged insert's entity, kept so it can join the identity map once the
/// store has assigned its id.
pub(crate) struct StagedEntity {
    entity: Tracked,
    with_id: fn(Tracked, i64) -> Tracked,
}

impl StagedEntity {
    pub(crate) fn new<T: Entity>(entity: T) -> Self {
        Self {
            entity: Box::new(entity),
            with_id: assign_id::<T>,
        }
    }

    fn into_tracked(self, id: i64) -> Tracked {
        (self.with_id)(self.entity, id)
    }
}

impl fmt::Debug for StagedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StagedEntity")
    }
}

fn assign_id<T: Entity>(entity: Tracked, id: i64) -> Tracked {
    match entity.downcast::<T>() {
        Ok(mut entity) => {
            entity.set_id(id);
            entity
        }
        Err(other) => other,
    }
}

/// An insert the store accepted, ready to be tracked under its new id
struct Inserted {
    table: &'static str,
    id: i64,
    entity: StagedEntity,
}

/// One logical operation's view of the store: staged mutations applied
/// together by `commit`, plus the entities read with tracking enabled.
///
/// Dropping a unit of work without committing discards everything staged.
pub struct UnitOfWork {
    pool: AnyPool,
    staged: Vec<StagedMutation>,
    identity_map: HashMap<IdentityKey, Tracked>,
    state: UnitOfWorkState,
}

impl UnitOfWork {
    pub fn new(pool: AnyPool) -> Self {
        Self {
            pool,
            staged: Vec::new(),
            identity_map: HashMap::new(),
            state: UnitOfWorkState::Idle,
        }
    }

    pub fn repository<T: Entity>(&mut self) -> Repository<'_, T> {
        Repository::new(self)
    }

    pub fn state(&self) -> UnitOfWorkState {
        self.state
    }

    /// Number of staged mutations
    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    pub fn is_tracked<T: Entity>(&self, id: i64) -> bool {
        self.identity_map.contains_key(&(T::TABLE, id))
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Drop everything staged without touching the store
    pub fn discard(&mut self) {
        self.staged.clear();
        if self.state == UnitOfWorkState::Dirty {
            self.state = UnitOfWorkState::Idle;
        }
    }

    /// Apply every staged mutation in call order inside one transaction.
    ///
    /// The transaction runs on its own task, so dropping the returned future
    /// does not interrupt it. Inserted entities are tracked under their new
    /// ids. Returns the number of mutations applied.
    pub async fn commit(&mut self) -> Result<usize, DatabaseError> {
        self.ensure_usable()?;
        if self.staged.is_empty() {
            // a previous commit future may have been dropped after taking the staged set
            self.state = UnitOfWorkState::Idle;
            return Ok(0);
        }

        let mutations = std::mem::take(&mut self.staged);
        let handle = tokio::spawn(apply(self.pool.clone(), mutations));
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join_error) => Err(DatabaseError::CommitAborted(join_error.to_string())),
        };

        match outcome {
            Ok((applied, inserted)) => {
                for Inserted { table, id, entity } in inserted {
                    self.identity_map.insert((table, id), entity.into_tracked(id));
                }
                self.state = UnitOfWorkState::Idle;
                info!("Committed {} staged mutation(s)", applied);
                Ok(applied)
            }
            Err(e) => {
                self.state = UnitOfWorkState::Failed;
                self.identity_map.clear();
                error!("Commit failed, unit of work is no longer usable: {}", e);
                Err(e)
            }
        }
    }

    pub(crate) fn ensure_usable(&self) -> Result<(), DatabaseError> {
        match self.state {
            UnitOfWorkState::Failed => Err(DatabaseError::UnitOfWorkFailed),
            _ => Ok(()),
        }
    }

    pub(crate) fn stage(&mut self, mutation: StagedMutation) -> Result<(), DatabaseError> {
        self.ensure_usable()?;
        debug!("Staged {:?}", mutation);
        self.staged.push(mutation);
        self.state = UnitOfWorkState::Dirty;
        Ok(())
    }

    /// Register a freshly read entity. If this identity is already tracked
    /// the tracked version wins, so staged changes stay visible.
    pub(crate) fn track<T: Entity>(&mut self, entity: T) -> T {
        let key = (T::TABLE, entity.id());
        if let Some(existing) = self.identity_map.get(&key).and_then(|b| b.downcast_ref::<T>()) {
            return existing.clone();
        }
        self.identity_map.insert(key, Box::new(entity.clone()));
        entity
    }

    /// Replace the tracked version after a staged update
    pub(crate) fn retrack<T: Entity>(&mut self, entity: &T) {
        self.identity_map.insert((T::TABLE, entity.id()), Box::new(entity.clone()));
    }

    pub(crate) fn forget<T: Entity>(&mut self, id: i64) {
        self.identity_map.remove(&(T::TABLE, id));
    }
}

async fn apply(pool: AnyPool, mutations: Vec<StagedMutation>) -> Result<(usize, Vec<Inserted>), DatabaseError> {
    let mut tx = pool.begin().await?;
    let applied = mutations.len();
    let mut assigned = Vec::new();

    for mutation in mutations {
        match mutation {
            StagedMutation::Insert { table, columns, values, slot, entity } => {
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({}) RETURNING \"id\"",
                    quote_identifier(table),
                    columns.iter().map(|c| quote_identifier(c)).collect::<Vec<_>>().join(", "),
                    placeholders(values.len(), 0)
                );
                debug!("SQL: {}", sql);
                let row = bind_all(sqlx::query(&sql), &values).fetch_one(&mut *tx).await?;
                let id = row.try_get::<i64, _>("id")?;
                assigned.push((slot, Inserted { table, id, entity }));
            }
            StagedMutation::Update { table, columns, id, values } => {
                let assignments = columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{} = ${}", quote_identifier(c), i + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "UPDATE {} SET {} WHERE \"id\" = ${}",
                    quote_identifier(table),
                    assignments,
                    columns.len() + 1
                );
                debug!("SQL: {}", sql);
                let result = bind_all(sqlx::query(&sql), &values).bind(id).execute(&mut *tx).await?;
                if result.rows_affected() == 0 {
                    return Err(DatabaseError::NotFound { table, id });
                }
            }
            StagedMutation::Delete { table, id } => {
                let sql = format!("DELETE FROM {} WHERE \"id\" = $1", quote_identifier(table));
                debug!("SQL: {}", sql);
                let result = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
                if result.rows_affected() == 0 {
                    return Err(DatabaseError::NotFound { table, id });
                }
            }
        }
    }

    tx.commit().await?;
    let inserted = assigned
        .into_iter()
        .map(|(slot, inserted)| {
            let _ = slot.set(inserted.id);
            inserted
        })
        .collect();
    Ok((applied, inserted))
}
