use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;

use crate::database::entity::{Entity, Relation};
use crate::database::value::SqlValue;

use super::{Attachment, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "User" => Ok(Role::User),
            "Admin" => Ok(Role::Admin),
            _ => Err(UnknownVariant { kind: "role", value }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never serialized
    #[serde(default, skip_serializing)]
    pub password: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub image_id: Option<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "username",
        "email",
        "password",
        "role",
        "image_id",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            (&self.first_name).into(),
            (&self.last_name).into(),
            (&self.username).into(),
            (&self.email).into(),
            (&self.password).into(),
            self.role.as_str().into(),
            self.image_id.into(),
            (&self.created_at).into(),
            (&self.updated_at).into(),
        ]
    }

    fn relations() -> Vec<Relation> {
        vec![Relation::belongs_to::<Attachment>("image", "image_id")]
    }
}
