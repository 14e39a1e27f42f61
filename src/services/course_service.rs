use serde_json::json;
use sqlx::AnyPool;
use tracing::info;

use super::{Actor, ServiceError, ServiceResult};
use crate::database::models::{
    timestamp, Attachment, Course, CourseCategory, CourseLevel, CourseTarget, Quiz, QuizContent, User,
};
use crate::database::{Loaded, Page, PaginationParams, QuerySpec, UnitOfWork, UNASSIGNED_ID};
use crate::dto::courses::{
    CourseCategoryForCreation, CourseFilter, CourseForCreation, CourseTargetForCreation, CourseView,
};
use crate::dto::users::UserView;
use crate::dto::Validate;

const COURSE_INCLUDES: [&str; 4] = ["author", "category", "image", "targets"];

pub struct CourseService {
    pool: AnyPool,
}

impl CourseService {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, actor: &Actor, dto: CourseForCreation) -> ServiceResult<CourseView> {
        dto.validate()?;
        let author_id = self.resolve_author(actor, dto.author_id)?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        Self::check_references(&mut uow, author_id, dto.category_id, dto.image_id).await?;

        let mut courses = uow.repository::<Course>();
        if courses.query(None).filter(json!({ "name": dto.name })).count().await? > 0 {
            return Err(ServiceError::AlreadyExists("Course with this name".to_string()));
        }

        let pending = courses.add(Course {
            id: UNASSIGNED_ID,
            name: dto.name,
            description: dto.description,
            author_id,
            image_id: dto.image_id,
            category_id: dto.category_id,
            level: dto.level.unwrap_or(CourseLevel::Beginner),
            created_at: timestamp(),
            updated_at: None,
        })?;
        courses.commit().await.map_err(|e| ServiceError::from_commit(e, "Course"))?;

        let course = pending.into_committed()?;
        info!("Created course {} '{}'", course.id, course.name);
        self.get(course.id).await
    }

    pub async fn get(&self, id: i64) -> ServiceResult<CourseView> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let loaded = uow
            .repository::<Course>()
            .get_one(json!({ "id": id }), &COURSE_INCLUDES)
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        Self::to_view(loaded)
    }

    pub async fn get_all(&self, filter: &CourseFilter, params: &PaginationParams) -> ServiceResult<Page<CourseView>> {
        let mut spec = QuerySpec::new().includes(COURSE_INCLUDES).no_tracking();
        if let Some(category_id) = filter.category_id {
            spec = spec.predicate(json!({ "category_id": category_id }));
        }

        let mut uow = UnitOfWork::new(self.pool.clone());
        let page = uow.repository::<Course>().query(Some(spec)).to_page(params).await?;
        page.try_map(Self::to_view)
    }

    /// Full replace of the course's editable fields by its author or an admin
    pub async fn update(&self, actor: &Actor, id: i64, dto: CourseForCreation) -> ServiceResult<CourseView> {
        dto.validate()?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let existing = uow
            .repository::<Course>()
            .get_one(json!({ "id": id }), &[])
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))?
            .into_inner();
        actor.ensure_can_manage(existing.author_id)?;

        let author_id = match dto.author_id {
            Some(author_id) if author_id != existing.author_id => self.resolve_author(actor, Some(author_id))?,
            _ => existing.author_id,
        };
        Self::check_references(&mut uow, author_id, dto.category_id, dto.image_id).await?;

        let mut courses = uow.repository::<Course>();
        let taken = courses
            .query(None)
            .filter(json!({ "name": dto.name, "id": { "$ne": id } }))
            .count()
            .await?;
        if taken > 0 {
            return Err(ServiceError::AlreadyExists("Course with this name".to_string()));
        }

        courses.update(Course {
            name: dto.name,
            description: dto.description,
            author_id,
            image_id: dto.image_id,
            category_id: dto.category_id,
            level: dto.level.unwrap_or(existing.level),
            updated_at: Some(timestamp()),
            ..existing
        })?;
        courses.commit().await.map_err(|e| ServiceError::from_commit(e, "Course"))?;
        self.get(id).await
    }

    pub async fn delete(&self, actor: &Actor, id: i64) -> ServiceResult<()> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut courses = uow.repository::<Course>();
        let course = courses
            .get_one(json!({ "id": id }), &[])
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        actor.ensure_can_manage(course.author_id)?;
        courses.delete(&course)?;

        // quizzes and answers cascade with the course; their contents do not
        let quizzes = uow
            .repository::<Quiz>()
            .query(Some(
                QuerySpec::new()
                    .predicate(json!({ "course_id": id }))
                    .include("content")
                    .no_tracking(),
            ))
            .fetch_all()
            .await?;
        let mut contents = uow.repository::<QuizContent>();
        for quiz in &quizzes {
            if let Some(content) = quiz.related::<QuizContent>("content")? {
                contents.delete(&content)?;
            }
        }

        uow.commit().await.map_err(|e| ServiceError::from_commit(e, "Course"))?;
        info!("Deleted course {} with {} quiz(zes)", id, quizzes.len());
        Ok(())
    }

    pub async fn add_target(&self, actor: &Actor, dto: CourseTargetForCreation) -> ServiceResult<CourseTarget> {
        dto.validate()?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let course = uow
            .repository::<Course>()
            .get_one(json!({ "id": dto.course_id }), &[])
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        actor.ensure_can_manage(course.author_id)?;

        let mut targets = uow.repository::<CourseTarget>();
        let pending = targets.add(CourseTarget {
            id: UNASSIGNED_ID,
            course_id: dto.course_id,
            name: dto.name,
            created_at: timestamp(),
        })?;
        targets.commit().await.map_err(|e| ServiceError::from_commit(e, "Course target"))?;
        Ok(pending.into_committed()?)
    }

    pub async fn get_targets(&self, course_id: i64) -> ServiceResult<Vec<CourseTarget>> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let course = uow
            .repository::<Course>()
            .get_one(json!({ "id": course_id }), &["targets"])
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        Ok(course.related_many("targets")?)
    }

    pub async fn create_category(&self, dto: CourseCategoryForCreation) -> ServiceResult<CourseCategory> {
        dto.validate()?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut categories = uow.repository::<CourseCategory>();
        if categories.query(None).filter(json!({ "name": dto.name })).count().await? > 0 {
            return Err(ServiceError::AlreadyExists("Category with this name".to_string()));
        }

        let pending = categories.add(CourseCategory {
            id: UNASSIGNED_ID,
            name: dto.name,
            created_at: timestamp(),
        })?;
        categories.commit().await.map_err(|e| ServiceError::from_commit(e, "Category"))?;
        Ok(pending.into_committed()?)
    }

    pub async fn get_categories(&self, params: &PaginationParams) -> ServiceResult<Page<CourseCategory>> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let page = uow
            .repository::<CourseCategory>()
            .query(Some(QuerySpec::new().no_tracking()))
            .order_by("name asc")
            .to_page(params)
            .await?;
        Ok(page.map(Loaded::into_inner))
    }

    /// Only administrators may create courses on behalf of someone else
    fn resolve_author(&self, actor: &Actor, requested: Option<i64>) -> ServiceResult<i64> {
        match requested {
            None => Ok(actor.user_id),
            Some(id) if id == actor.user_id || actor.is_admin() => Ok(id),
            Some(_) => Err(ServiceError::forbidden("Only administrators may assign another author")),
        }
    }

    async fn check_references(
        uow: &mut UnitOfWork,
        author_id: i64,
        category_id: i64,
        image_id: Option<i64>,
    ) -> ServiceResult<()> {
        let spec = |id: i64| Some(QuerySpec::new().predicate(json!({ "id": id })).no_tracking());

        if uow.repository::<User>().query(spec(author_id)).count().await? == 0 {
            return Err(ServiceError::not_found("Author"));
        }
        if uow.repository::<CourseCategory>().query(spec(category_id)).count().await? == 0 {
            return Err(ServiceError::not_found("Category"));
        }
        if let Some(image_id) = image_id {
            if uow.repository::<Attachment>().query(spec(image_id)).count().await? == 0 {
                return Err(ServiceError::not_found("Image"));
            }
        }
        Ok(())
    }

    fn to_view(loaded: Loaded<Course>) -> ServiceResult<CourseView> {
        let author = loaded.related::<User>("author")?.map(UserView::from);
        let category = loaded.related::<CourseCategory>("category")?;
        let image = loaded.related::<Attachment>("image")?;
        let targets = loaded.related_many::<CourseTarget>("targets")?;
        let course = loaded.into_inner();

        Ok(CourseView {
            id: course.id,
            name: course.name,
            description: course.description,
            level: course.level,
            author_id: course.author_id,
            category_id: course.category_id,
            author,
            category,
            image,
            targets,
            created_at: course.created_at,
            updated_at: course.updated_at,
        })
    }
}
