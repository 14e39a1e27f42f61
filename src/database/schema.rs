use serde_json::json;
use sqlx::AnyPool;
use tracing::{debug, info};

use super::manager::DatabaseError;
use super::models::{timestamp, Role, User};
use super::unit_of_work::UnitOfWork;
use super::entity::UNASSIGNED_ID;
use crate::config::AdminSeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self, DatabaseError> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(DatabaseError::UnsupportedScheme(scheme.to_string())),
        }
    }

    fn id_column(&self) -> &'static str {
        match self {
            Dialect::Postgres => "\"id\" BIGSERIAL PRIMARY KEY",
            Dialect::Sqlite => "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }
}

/// Table definitions in dependency order. `{id}` is replaced per dialect.
const TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "attachments" (
        {id},
        "name" TEXT NOT NULL,
        "path" TEXT NOT NULL,
        "content_type" TEXT,
        "size" BIGINT NOT NULL,
        "created_at" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "users" (
        {id},
        "first_name" TEXT NOT NULL,
        "last_name" TEXT NOT NULL,
        "username" TEXT NOT NULL UNIQUE,
        "email" TEXT NOT NULL UNIQUE,
        "password" TEXT NOT NULL,
        "role" TEXT NOT NULL,
        "image_id" BIGINT REFERENCES "attachments" ("id") ON DELETE SET NULL,
        "created_at" TEXT NOT NULL,
        "updated_at" TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "course_categories" (
        {id},
        "name" TEXT NOT NULL UNIQUE,
        "created_at" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "courses" (
        {id},
        "name" TEXT NOT NULL UNIQUE,
        "description" TEXT,
        "author_id" BIGINT NOT NULL REFERENCES "users" ("id"),
        "image_id" BIGINT REFERENCES "attachments" ("id") ON DELETE SET NULL,
        "category_id" BIGINT NOT NULL REFERENCES "course_categories" ("id"),
        "level" TEXT NOT NULL,
        "created_at" TEXT NOT NULL,
        "updated_at" TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "course_targets" (
        {id},
        "course_id" BIGINT NOT NULL REFERENCES "courses" ("id") ON DELETE CASCADE,
        "name" TEXT NOT NULL,
        "created_at" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "saved_courses" (
        {id},
        "user_id" BIGINT NOT NULL REFERENCES "users" ("id") ON DELETE CASCADE,
        "course_id" BIGINT NOT NULL REFERENCES "courses" ("id") ON DELETE CASCADE,
        "created_at" TEXT NOT NULL,
        UNIQUE ("user_id", "course_id")
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "quiz_contents" (
        {id},
        "question" TEXT NOT NULL,
        "created_at" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "quiz_assets" (
        {id},
        "quiz_content_id" BIGINT NOT NULL REFERENCES "quiz_contents" ("id") ON DELETE CASCADE,
        "file_id" BIGINT NOT NULL REFERENCES "attachments" ("id"),
        "created_at" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "quizzes" (
        {id},
        "course_id" BIGINT NOT NULL REFERENCES "courses" ("id") ON DELETE CASCADE,
        "quiz_content_id" BIGINT NOT NULL REFERENCES "quiz_contents" ("id"),
        "created_at" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "question_answers" (
        {id},
        "quiz_id" BIGINT NOT NULL REFERENCES "quizzes" ("id") ON DELETE CASCADE,
        "answer" TEXT NOT NULL,
        "is_correct" BIGINT NOT NULL DEFAULT 0,
        "created_at" TEXT NOT NULL
    )"#,
];

/// Create every table that does not exist yet
pub async fn migrate(pool: &AnyPool, dialect: Dialect) -> Result<(), DatabaseError> {
    for table in TABLES {
        let ddl = table.replace("{id}", dialect.id_column());
        debug!("DDL: {}", ddl);
        sqlx::query(&ddl).execute(pool).await?;
    }
    Ok(())
}

/// Insert the administrator account unless a user with that name exists
pub async fn seed_admin(pool: &AnyPool, seed: &AdminSeed, password_cost: u32) -> Result<(), DatabaseError> {
    let mut uow = UnitOfWork::new(pool.clone());
    let mut users = uow.repository::<User>();
    if users
        .query(None)
        .filter(json!({ "username": seed.username }))
        .count()
        .await?
        > 0
    {
        return Ok(());
    }

    users.add(User {
        id: UNASSIGNED_ID,
        first_name: "Admin".to_string(),
        last_name: "Admin".to_string(),
        username: seed.username.clone(),
        email: seed.email.clone(),
        password: crate::auth::hash_password(&seed.password, password_cost)
            .map_err(|e| DatabaseError::AdminSeed(e.to_string()))?,
        role: Role::Admin,
        image_id: None,
        created_at: timestamp(),
        updated_at: None,
    })?;
    users.commit().await?;
    info!("Seeded administrator account: {}", seed.username);
    Ok(())
}
