pub mod entity;
pub mod include;
pub mod manager;
pub mod models;
pub mod pagination;
pub mod query_builder;
pub mod repository;
pub mod schema;
pub mod unit_of_work;
pub mod value;

pub use entity::{Entity, Loaded, Relation, RelationKind, UNASSIGNED_ID};
pub use manager::{DatabaseError, DatabaseManager};
pub use pagination::{Page, PageMeta, PaginationParams};
pub use query_builder::{LazyQuery, QuerySpec};
pub use repository::{Pending, Repository};
pub use schema::Dialect;
pub use unit_of_work::{UnitOfWork, UnitOfWorkState};
pub use value::SqlValue;
