use serde::Deserialize;
use serde_json::json;
use sqlx::AnyPool;
use tracing::{info, warn};

use super::attachment_service::AttachmentService;
use super::{Actor, ServiceError, ServiceResult};
use crate::database::models::{timestamp, Attachment, Course, QuestionAnswer, Quiz, QuizAsset, QuizContent};
use crate::database::{DatabaseError, Loaded, Page, PaginationParams, QuerySpec, UnitOfWork, UNASSIGNED_ID};
use crate::dto::attachments::UploadedFile;
use crate::dto::quizzes::{AnswerView, QuizAnswerCheck, QuizFilter, QuizForCreation, QuizResultView, QuizView};
use crate::dto::Validate;

const QUIZ_INCLUDES: [&str; 2] = ["content.assets.file", "answers"];

/// Shape of an eager-loaded `content.assets.file` tree
#[derive(Deserialize)]
struct LoadedContent {
    question: String,
    #[serde(default)]
    assets: Vec<LoadedAsset>,
}

#[derive(Deserialize)]
struct LoadedAsset {
    file: Option<Attachment>,
}

pub struct QuizService {
    pool: AnyPool,
}

impl QuizService {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Create the question, the quiz and its answers.
    ///
    /// Each step needs the identity assigned by the previous commit; if a
    /// later step fails the rows already written are removed again.
    pub async fn create(&self, actor: &Actor, dto: QuizForCreation) -> ServiceResult<QuizView> {
        dto.validate()?;
        let course = self.course(dto.course_id).await?;
        actor.ensure_can_manage(course.author_id)?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let content = uow.repository::<QuizContent>().add(QuizContent {
            id: UNASSIGNED_ID,
            question: dto.question,
            created_at: timestamp(),
        })?;
        uow.commit().await?;
        let content = content.into_committed()?;

        let quiz = uow.repository::<Quiz>().add(Quiz {
            id: UNASSIGNED_ID,
            course_id: course.id,
            quiz_content_id: content.id,
            created_at: timestamp(),
        })?;
        if let Err(e) = uow.commit().await {
            self.remove_partial(None, &content).await;
            return Err(ServiceError::from_commit(e, "Quiz"));
        }
        let quiz = quiz.into_committed()?;

        let mut answers = uow.repository::<QuestionAnswer>();
        for answer in dto.answers {
            answers.add(QuestionAnswer {
                id: UNASSIGNED_ID,
                quiz_id: quiz.id,
                answer: answer.answer,
                is_correct: answer.is_correct,
                created_at: timestamp(),
            })?;
        }
        if let Err(e) = answers.commit().await {
            self.remove_partial(Some(&quiz), &content).await;
            return Err(ServiceError::from_commit(e, "Answer"));
        }

        info!("Created quiz {} for course {}", quiz.id, course.id);
        self.get(quiz.id).await
    }

    pub async fn get(&self, id: i64) -> ServiceResult<QuizView> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let loaded = uow
            .repository::<Quiz>()
            .get_one(json!({ "id": id }), &QUIZ_INCLUDES)
            .await?
            .ok_or_else(|| ServiceError::not_found("Quiz"))?;
        Self::to_view(loaded)
    }

    pub async fn get_all(&self, filter: &QuizFilter, params: &PaginationParams) -> ServiceResult<Page<QuizView>> {
        let mut spec = QuerySpec::new().includes(QUIZ_INCLUDES).no_tracking();
        if let Some(course_id) = filter.course_id {
            spec = spec.predicate(json!({ "course_id": course_id }));
        }

        let mut uow = UnitOfWork::new(self.pool.clone());
        let page = uow.repository::<Quiz>().query(Some(spec)).to_page(params).await?;
        page.try_map(Self::to_view)
    }

    /// Remove the quiz, then its question; answers and assets cascade
    pub async fn delete(&self, actor: &Actor, id: i64) -> ServiceResult<()> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let quiz = uow
            .repository::<Quiz>()
            .get_one(json!({ "id": id }), &["course", "content"])
            .await?
            .ok_or_else(|| ServiceError::not_found("Quiz"))?;
        let course = quiz
            .related::<Course>("course")?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        actor.ensure_can_manage(course.author_id)?;
        let content = quiz.related::<QuizContent>("content")?;

        uow.repository::<Quiz>().delete(&quiz)?;
        if let Some(content) = content {
            uow.repository::<QuizContent>().delete(&content)?;
        }
        uow.commit().await.map_err(|e| ServiceError::from_commit(e, "Quiz"))?;
        info!("Deleted quiz {}", id);
        Ok(())
    }

    pub async fn check(&self, id: i64, dto: QuizAnswerCheck) -> ServiceResult<QuizResultView> {
        let quiz = self.get(id).await?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let choice = uow
            .repository::<QuestionAnswer>()
            .query(Some(
                QuerySpec::new()
                    .predicate(json!({ "id": dto.answer_id, "quiz_id": id }))
                    .no_tracking(),
            ))
            .fetch_optional()
            .await?
            .ok_or_else(|| ServiceError::not_found("Answer"))?
            .into_inner();

        Ok(QuizResultView {
            is_correct: choice.is_correct,
            quiz,
            choice,
        })
    }

    /// Upload a file and attach it to the quiz question
    pub async fn add_asset(
        &self,
        actor: &Actor,
        quiz_id: i64,
        file: UploadedFile,
        attachments: &AttachmentService,
    ) -> ServiceResult<QuizView> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let quiz = uow
            .repository::<Quiz>()
            .get_one(json!({ "id": quiz_id }), &["course"])
            .await?
            .ok_or_else(|| ServiceError::not_found("Quiz"))?;
        let course = quiz
            .related::<Course>("course")?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        actor.ensure_can_manage(course.author_id)?;

        let attachment = attachments.upload(file).await?;
        uow.repository::<QuizAsset>().add(QuizAsset {
            id: UNASSIGNED_ID,
            quiz_content_id: quiz.quiz_content_id,
            file_id: attachment.id,
            created_at: timestamp(),
        })?;
        uow.commit().await.map_err(|e| ServiceError::from_commit(e, "Quiz asset"))?;
        self.get(quiz_id).await
    }

    async fn course(&self, id: i64) -> ServiceResult<Course> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.repository::<Course>()
            .query(Some(QuerySpec::new().predicate(json!({ "id": id })).no_tracking()))
            .fetch_optional()
            .await?
            .map(Loaded::into_inner)
            .ok_or_else(|| ServiceError::not_found("Course"))
    }

    async fn remove_partial(&self, quiz: Option<&Quiz>, content: &QuizContent) {
        if let Err(e) = self.try_remove(quiz, content).await {
            warn!("Failed to remove partially created quiz content {}: {}", content.id, e);
        }
    }

    async fn try_remove(&self, quiz: Option<&Quiz>, content: &QuizContent) -> Result<usize, DatabaseError> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        if let Some(quiz) = quiz {
            uow.repository::<Quiz>().delete(quiz)?;
        }
        uow.repository::<QuizContent>().delete(content)?;
        uow.commit().await
    }

    fn to_view(loaded: Loaded<Quiz>) -> ServiceResult<QuizView> {
        let content = loaded.related::<LoadedContent>("content")?;
        let answers = loaded.related_many::<QuestionAnswer>("answers")?;
        let quiz = loaded.into_inner();

        let (question, assets) = match content {
            Some(content) => (
                content.question,
                content.assets.into_iter().filter_map(|a| a.file).collect(),
            ),
            None => (String::new(), Vec::new()),
        };

        Ok(QuizView {
            id: quiz.id,
            course_id: quiz.course_id,
            question,
            assets,
            answers: answers.into_iter().map(AnswerView::from).collect(),
            created_at: quiz.created_at,
        })
    }
}
