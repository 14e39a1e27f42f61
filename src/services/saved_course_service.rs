use serde_json::json;
use sqlx::AnyPool;

use super::{Actor, ServiceError, ServiceResult};
use crate::database::models::{timestamp, Course, SavedCourse};
use crate::database::{Page, PaginationParams, QuerySpec, UnitOfWork, UNASSIGNED_ID};
use crate::dto::users::{SavedCourseForCreation, SavedCourseToggle, SavedCourseView};
use crate::dto::Validate;

pub struct SavedCourseService {
    pool: AnyPool,
}

impl SavedCourseService {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Save the course for the caller, or unsave it if already saved
    pub async fn toggle(&self, actor: &Actor, dto: SavedCourseForCreation) -> ServiceResult<SavedCourseToggle> {
        dto.validate()?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        if uow
            .repository::<Course>()
            .query(Some(QuerySpec::new().predicate(json!({ "id": dto.course_id })).no_tracking()))
            .count()
            .await?
            == 0
        {
            return Err(ServiceError::not_found("Course"));
        }

        let mut saved = uow.repository::<SavedCourse>();
        let existing = saved
            .get_one(json!({ "user_id": actor.user_id, "course_id": dto.course_id }), &[])
            .await?;

        let now_saved = match existing {
            Some(existing) => {
                saved.delete(&existing)?;
                false
            }
            None => {
                saved.add(SavedCourse {
                    id: UNASSIGNED_ID,
                    user_id: actor.user_id,
                    course_id: dto.course_id,
                    created_at: timestamp(),
                })?;
                true
            }
        };
        saved.commit().await.map_err(|e| ServiceError::from_commit(e, "Saved course"))?;

        Ok(SavedCourseToggle {
            course_id: dto.course_id,
            saved: now_saved,
        })
    }

    pub async fn get_all(&self, actor: &Actor, params: &PaginationParams) -> ServiceResult<Page<SavedCourseView>> {
        let spec = QuerySpec::new()
            .predicate(json!({ "user_id": actor.user_id }))
            .include("course")
            .no_tracking();

        let mut uow = UnitOfWork::new(self.pool.clone());
        let page = uow.repository::<SavedCourse>().query(Some(spec)).to_page(params).await?;
        page.try_map(|loaded| {
            let course = loaded.related::<Course>("course")?;
            let saved = loaded.into_inner();
            Ok(SavedCourseView {
                id: saved.id,
                course,
                created_at: saved.created_at,
            })
        })
    }
}
