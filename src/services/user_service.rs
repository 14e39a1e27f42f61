use serde_json::json;
use sqlx::AnyPool;
use tracing::info;

use super::attachment_service::AttachmentService;
use super::{Actor, ServiceError, ServiceResult};
use crate::auth::{hash_password, verify_password};
use crate::database::models::{timestamp, Attachment, Role, User};
use crate::database::{Loaded, Page, PaginationParams, QuerySpec, UnitOfWork, UNASSIGNED_ID};
use crate::dto::attachments::UploadedFile;
use crate::dto::users::{UserForChangePassword, UserForCreation, UserView};
use crate::dto::Validate;

pub struct UserService {
    pool: AnyPool,
    password_cost: u32,
}

impl UserService {
    pub fn new(pool: AnyPool) -> Self {
        Self {
            pool,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// bcrypt work factor used when this service stores a password
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    /// Register a regular user
    pub async fn create(&self, dto: UserForCreation) -> ServiceResult<UserView> {
        dto.validate()?;
        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut users = uow.repository::<User>();

        if users.query(None).filter(json!({ "username": dto.username })).count().await? > 0 {
            return Err(ServiceError::AlreadyExists("User with this username".to_string()));
        }
        if users.query(None).filter(json!({ "email": dto.email })).count().await? > 0 {
            return Err(ServiceError::AlreadyExists("User with this email".to_string()));
        }

        let pending = users.add(User {
            id: UNASSIGNED_ID,
            first_name: dto.first_name,
            last_name: dto.last_name,
            username: dto.username,
            email: dto.email,
            password: hash_password(&dto.password, self.password_cost)?,
            role: Role::User,
            image_id: None,
            created_at: timestamp(),
            updated_at: None,
        })?;
        users.commit().await.map_err(|e| ServiceError::from_commit(e, "User"))?;

        let user = pending.into_committed()?;
        info!("Registered user {} ({})", user.username, user.id);
        Ok(UserView::from(user))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<UserView> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let loaded = uow
            .repository::<User>()
            .get_one(json!({ "id": id }), &["image"])
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        Self::to_view(loaded)
    }

    pub async fn get_all(&self, params: &PaginationParams) -> ServiceResult<Page<UserView>> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let page = uow
            .repository::<User>()
            .query(Some(QuerySpec::new().include("image").no_tracking()))
            .to_page(params)
            .await?;
        page.try_map(Self::to_view)
    }

    /// Replace every editable field of a user; callers may edit themselves,
    /// administrators anyone
    pub async fn update(&self, actor: &Actor, id: i64, dto: UserForCreation) -> ServiceResult<UserView> {
        dto.validate()?;
        actor.ensure_can_manage(id)?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut users = uow.repository::<User>();
        let existing = users
            .get_one(json!({ "id": id }), &[])
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?
            .into_inner();

        let taken = users
            .query(None)
            .filter(json!({
                "$or": [ { "username": dto.username }, { "email": dto.email } ],
                "id": { "$ne": id }
            }))
            .count()
            .await?;
        if taken > 0 {
            return Err(ServiceError::AlreadyExists("User with this username or email".to_string()));
        }

        let updated = users.update(User {
            first_name: dto.first_name,
            last_name: dto.last_name,
            username: dto.username,
            email: dto.email,
            password: hash_password(&dto.password, self.password_cost)?,
            updated_at: Some(timestamp()),
            ..existing
        })?;
        users.commit().await.map_err(|e| ServiceError::from_commit(e, "User"))?;

        info!("Updated user {}", updated.id);
        self.get(updated.id).await
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut users = uow.repository::<User>();
        let user = users
            .get_one(json!({ "id": id }), &[])
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        users.delete(&user)?;
        users.commit().await.map_err(|e| ServiceError::from_commit(e, "User"))?;
        info!("Deleted user {}", id);
        Ok(())
    }

    pub async fn change_password(&self, actor: &Actor, dto: UserForChangePassword) -> ServiceResult<UserView> {
        dto.validate()?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut users = uow.repository::<User>();
        let user = users
            .get_one(json!({ "username": dto.username }), &[])
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?
            .into_inner();
        actor.ensure_can_manage(user.id)?;

        if !verify_password(&dto.old_password, &user.password) {
            return Err(ServiceError::BadRequest("Old password is incorrect".to_string()));
        }

        let updated = users.update(User {
            password: hash_password(&dto.new_password, self.password_cost)?,
            updated_at: Some(timestamp()),
            ..user
        })?;
        users.commit().await?;
        Ok(UserView::from(updated))
    }

    /// The caller's own profile
    pub async fn get_info(&self, actor: &Actor) -> ServiceResult<UserView> {
        self.get(actor.user_id).await
    }

    /// Store an uploaded image and make it the user's picture
    pub async fn set_image(
        &self,
        actor: &Actor,
        user_id: i64,
        file: UploadedFile,
        attachments: &AttachmentService,
    ) -> ServiceResult<UserView> {
        actor.ensure_can_manage(user_id)?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut users = uow.repository::<User>();
        let user = users
            .get_one(json!({ "id": user_id }), &[])
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?
            .into_inner();

        let attachment: Attachment = attachments.upload(file).await?;
        let updated = users.update(User {
            image_id: Some(attachment.id),
            updated_at: Some(timestamp()),
            ..user
        })?;
        users.commit().await?;
        Ok(UserView::new(updated, Some(attachment)))
    }

    fn to_view(loaded: Loaded<User>) -> ServiceResult<UserView> {
        let image = loaded.related::<Attachment>("image")?;
        Ok(UserView::new(loaded.into_inner(), image))
    }
}
