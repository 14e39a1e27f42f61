use serde_json::{json, Map, Value};
use sqlx::Row;
use std::marker::PhantomData;
use tracing::debug;

use super::entity::{Entity, Loaded};
use super::include;
use super::manager::DatabaseError;
use super::pagination::{Page, PageMeta, PaginationParams};
use super::unit_of_work::UnitOfWork;
use super::value::bind_all;
use crate::filter::Filter;

/// What to read: an optional predicate, relations to eager-load, and whether
/// results enter the unit of work's identity map.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub predicate: Option<Value>,
    pub includes: Vec<String>,
    pub tracking: bool,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            predicate: None,
            includes: Vec::new(),
            tracking: true,
        }
    }
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicate(mut self, predicate: Value) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Eager-load a relation path such as `"author"` or `"content.assets.file"`
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(path.into());
        self
    }

    pub fn includes<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn no_tracking(mut self) -> Self {
        self.tracking = false;
        self
    }

    pub fn tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }
}

/// A composed but not yet executed query. Nothing touches the store and no
/// error is reported until one of the async terminal methods is awaited.
pub struct LazyQuery<'u, T: Entity> {
    uow: &'u mut UnitOfWork,
    spec: QuerySpec,
    filters: Vec<Value>,
    order: Vec<Value>,
    offset: Option<i64>,
    limit: Option<i64>,
    _entity: PhantomData<T>,
}

impl<'u, T: Entity> LazyQuery<'u, T> {
    pub(crate) fn new(uow: &'u mut UnitOfWork, spec: QuerySpec) -> Self {
        Self {
            uow,
            spec,
            filters: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
            _entity: PhantomData,
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Narrow further; combined with the predicate using AND
    pub fn filter(mut self, predicate: Value) -> Self {
        self.filters.push(predicate);
        self
    }

    /// `"name desc"`, `["level asc", "name"]` or `{ "name": "desc" }`
    pub fn order_by(mut self, order: impl Into<Value>) -> Self {
        self.order.push(order.into());
        self
    }

    pub fn skip(mut self, count: i64) -> Self {
        self.offset = Some(count);
        self
    }

    pub fn take(mut self, count: i64) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn paginate(self, params: &PaginationParams) -> Self {
        self.skip(params.offset()).take(params.limit())
    }

    pub async fn fetch_all(mut self) -> Result<Vec<Loaded<T>>, DatabaseError> {
        self.load().await
    }

    pub async fn fetch_optional(self) -> Result<Option<Loaded<T>>, DatabaseError> {
        let mut query = self.take(1);
        Ok(query.load().await?.into_iter().next())
    }

    /// Number of matching records, ignoring skip/take
    pub async fn count(mut self) -> Result<i64, DatabaseError> {
        self.count_rows().await
    }

    /// Total count plus the requested page of items
    pub async fn to_page(mut self, params: &PaginationParams) -> Result<Page<Loaded<T>>, DatabaseError> {
        let total_count = self.count_rows().await?;
        let mut query = self.paginate(params);
        let items = query.load().await?;
        Ok(Page {
            items,
            meta: PageMeta::new(params, total_count),
        })
    }

    fn build_filter(&self) -> Result<Filter, DatabaseError> {
        let mut filter = Filter::new(T::TABLE)?;
        if let Some(predicate) = &self.spec.predicate {
            filter.where_clause(predicate.clone())?;
        }
        for predicate in &self.filters {
            filter.where_clause(predicate.clone())?;
        }
        for order in &self.order {
            filter.order(order.clone())?;
        }
        if !filter.has_order() {
            filter.order(json!("id asc"))?;
        }
        filter.limit(self.limit, self.offset);
        Ok(filter)
    }

    async fn count_rows(&mut self) -> Result<i64, DatabaseError> {
        self.uow.ensure_usable()?;
        let sql = self.build_filter()?.to_count_sql()?;
        debug!("SQL: {} {:?}", sql.query, sql.params);
        let row = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_one(self.uow.pool())
            .await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    async fn load(&mut self) -> Result<Vec<Loaded<T>>, DatabaseError> {
        self.uow.ensure_usable()?;
        let relations = T::relations();
        include::validate_paths(&relations, &self.spec.includes)?;

        let sql = self.build_filter()?.to_sql()?;
        debug!("SQL: {} {:?}", sql.query, sql.params);
        let rows = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_all(self.uow.pool())
            .await?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            entities.push(T::from_row(row)?);
        }

        let mut related: Vec<Map<String, Value>> = if self.spec.includes.is_empty() {
            vec![Map::new(); entities.len()]
        } else {
            let mut roots: Vec<Map<String, Value>> = rows.iter().map(include::row_to_json).collect();
            include::load_includes(self.uow.pool(), &mut roots, &relations, &self.spec.includes).await?;
            roots
                .into_iter()
                .map(|mut root| self.take_included(&mut root))
                .collect()
        };

        let tracking = self.spec.tracking;
        Ok(entities
            .into_iter()
            .zip(related.drain(..))
            .map(|(entity, related)| {
                let entity = if tracking { self.uow.track(entity) } else { entity };
                Loaded::with_related(entity, related)
            })
            .collect())
    }

    /// Split the eager-loaded relations off a root row
    fn take_included(&self, root: &mut Map<String, Value>) -> Map<String, Value> {
        let mut related = Map::new();
        for path in &self.spec.includes {
            let name = path.split('.').next().unwrap_or(path);
            if let Some(value) = root.remove(name) {
                related.insert(name.to_string(), value);
            }
        }
        related
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_tracks_and_reads_everything() {
        let spec = QuerySpec::default();
        assert!(spec.tracking);
        assert!(spec.predicate.is_none());
        assert!(spec.includes.is_empty());
    }

    #[test]
    fn builder_accumulates_includes_in_order() {
        let spec = QuerySpec::new()
            .predicate(json!({ "id": 1 }))
            .include("author")
            .includes(["category", "targets"])
            .no_tracking();
        assert_eq!(spec.includes, vec!["author", "category", "targets"]);
        assert!(!spec.tracking);
    }
}
