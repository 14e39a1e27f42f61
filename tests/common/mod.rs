#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::AnyPool;
use tempfile::TempDir;
use tower::ServiceExt;

use zamin_api::auth::hash_password;
use zamin_api::config::{AdminSeed, AppConfig};
use zamin_api::database::models::{timestamp, Course, CourseCategory, CourseLevel, Role, User};
use zamin_api::database::{schema, DatabaseManager, Dialect, UnitOfWork, UNASSIGNED_ID};
use zamin_api::{app, AppState};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin12345";
/// Lowest bcrypt work factor, keeps the suites fast
pub const TEST_HASH_COST: u32 = 4;

/// A migrated SQLite database in a private temporary directory
pub struct TestDb {
    pub pool: AnyPool,
    _dir: TempDir,
}

pub async fn test_db() -> Result<TestDb> {
    let dir = tempfile::tempdir().context("failed to create temp dir")?;
    let url = format!("sqlite://{}/test.db?mode=rwc", dir.path().display());
    let pool = DatabaseManager::connect(&url, 5, 5).await?;
    schema::migrate(&pool, Dialect::Sqlite).await?;
    Ok(TestDb { pool, _dir: dir })
}

/// Development settings pointed at a temporary directory
pub fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::development();
    config.database.url = format!("sqlite://{}/zamin.db?mode=rwc", dir.path().display());
    config.database.default_tenant = "zamin".to_string();
    config.database.tenants = vec!["school_two".to_string()];
    config.security.jwt_secret = "test-secret".to_string();
    config.security.password_hash_cost = TEST_HASH_COST;
    config.security.admin = Some(AdminSeed {
        username: ADMIN_USERNAME.to_string(),
        password: ADMIN_PASSWORD.to_string(),
        email: "admin@zamin.test".to_string(),
    });
    config.storage.root = dir.path().join("files");
    config.storage.max_upload_bytes = 1024;
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Vec<u8>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create temp dir")?;
        let state = AppState::new(test_config(&dir));
        let router = app(state.clone());
        Ok(Self {
            router,
            state,
            _dir: dir,
        })
    }

    /// Directory holding the tenant databases and uploaded files
    pub fn dir(&self) -> &std::path::Path {
        self._dir.path()
    }

    /// Pool of the default tenant
    pub async fn pool(&self) -> Result<AnyPool> {
        let tenant = self.state.config.database.default_tenant.clone();
        Ok(self.state.databases.tenant_pool(&tenant).await?)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?.to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok(TestResponse {
            status,
            headers,
            body,
            bytes,
        })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.send(request(Method::GET, uri, token, None)?).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.send(request(Method::POST, uri, token, Some(body))?).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.send(request(Method::PUT, uri, token, Some(body))?).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.send(request(Method::DELETE, uri, token, None)?).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let res = self
            .post("/api/auth/login", None, json!({ "username": username, "password": password }))
            .await?;
        anyhow::ensure!(res.status == StatusCode::OK, "login failed: {} {}", res.status, res.body);
        res.body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("token missing from login response")
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Register a user and return their token
    pub async fn register(&self, username: &str) -> Result<String> {
        let password = "password123";
        let res = self
            .post(
                "/api/users",
                None,
                json!({
                    "first_name": "Test",
                    "last_name": "User",
                    "username": username,
                    "email": format!("{}@zamin.test", username),
                    "password": password,
                }),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "register failed: {} {}", res.status, res.body);
        self.login(username, password).await
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value)?)
        }
        None => Body::empty(),
    };
    Ok(builder.body(body)?)
}

/// A multipart/form-data request carrying one file in the `file` field
pub fn multipart_request(uri: &str, token: &str, file_name: &str, contents: &[u8]) -> Result<Request<Body>> {
    let boundary = "zamin-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n", file_name).as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Ok(Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))?)
}

pub fn new_user(username: &str) -> User {
    User {
        id: UNASSIGNED_ID,
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        username: username.to_string(),
        email: format!("{}@zamin.test", username),
        password: hash_password("password123", TEST_HASH_COST).expect("hash test password"),
        role: Role::User,
        image_id: None,
        created_at: timestamp(),
        updated_at: None,
    }
}

pub fn new_category(name: &str) -> CourseCategory {
    CourseCategory {
        id: UNASSIGNED_ID,
        name: name.to_string(),
        created_at: timestamp(),
    }
}

pub fn new_course(name: &str, author_id: i64, category_id: i64) -> Course {
    Course {
        id: UNASSIGNED_ID,
        name: name.to_string(),
        description: Some(format!("About {}", name)),
        author_id,
        image_id: None,
        category_id,
        level: CourseLevel::Beginner,
        created_at: timestamp(),
        updated_at: None,
    }
}

/// Insert an author and a category, returning their ids
pub async fn seed_author_and_category(pool: &AnyPool) -> Result<(i64, i64)> {
    let mut uow = UnitOfWork::new(pool.clone());
    let author = uow.repository::<User>().add(new_user("author"))?;
    let category = uow.repository::<CourseCategory>().add(new_category("Programming"))?;
    uow.commit().await?;
    Ok((author.into_committed()?.id, category.into_committed()?.id))
}
