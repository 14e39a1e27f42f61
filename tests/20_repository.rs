mod common;

use anyhow::Result;
use serde_json::json;

use common::{new_category, new_course, new_user, seed_author_and_category, test_db};
use zamin_api::database::models::{
    timestamp, Attachment, Course, CourseCategory, CourseTarget, QuestionAnswer, Quiz, QuizAsset, QuizContent, User,
};
use zamin_api::database::{DatabaseError, PaginationParams, QuerySpec, UnitOfWork, UnitOfWorkState, UNASSIGNED_ID};

#[tokio::test]
async fn add_then_commit_assigns_identity() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());

    let pending = uow.repository::<CourseCategory>().add(new_category("Languages"))?;
    assert_eq!(pending.id(), None, "identity must not exist before commit");
    assert_eq!(uow.state(), UnitOfWorkState::Dirty);

    assert_eq!(uow.commit().await?, 1);
    assert_eq!(uow.state(), UnitOfWorkState::Idle);
    let category = pending.into_committed()?;
    assert!(category.id > 0);
    assert!(uow.is_tracked::<CourseCategory>(category.id), "committed inserts join the identity map");
    let tracked = uow
        .repository::<CourseCategory>()
        .get_one(json!({ "id": category.id }), &[])
        .await?
        .expect("tracked category");
    assert_eq!(tracked.id, category.id);

    let mut reader = UnitOfWork::new(db.pool.clone());
    let found = reader
        .repository::<CourseCategory>()
        .get_one(json!({ "id": category.id }), &[])
        .await?
        .expect("category should be readable after commit");
    assert_eq!(found.name, "Languages");
    Ok(())
}

#[tokio::test]
async fn staged_changes_are_invisible_until_commit() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    uow.repository::<CourseCategory>().add(new_category("Music"))?;

    let mut other = UnitOfWork::new(db.pool.clone());
    assert_eq!(other.repository::<CourseCategory>().query(None).count().await?, 0);

    uow.discard();
    assert_eq!(uow.pending(), 0);
    assert_eq!(uow.commit().await?, 0);
    assert_eq!(other.repository::<CourseCategory>().query(None).count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn update_replaces_every_column() -> Result<()> {
    let db = test_db().await?;
    let (author_id, category_id) = seed_author_and_category(&db.pool).await?;

    let mut uow = UnitOfWork::new(db.pool.clone());
    let pending = uow.repository::<Course>().add(new_course("Rust", author_id, category_id))?;
    uow.commit().await?;
    let course = pending.into_committed()?;
    assert!(course.description.is_some());

    let mut uow = UnitOfWork::new(db.pool.clone());
    uow.repository::<Course>().update(Course {
        name: "Rust 2".to_string(),
        description: None,
        ..course.clone()
    })?;
    uow.commit().await?;

    let mut reader = UnitOfWork::new(db.pool.clone());
    let stored = reader
        .repository::<Course>()
        .get_one(json!({ "id": course.id }), &[])
        .await?
        .expect("course exists");
    assert_eq!(stored.name, "Rust 2");
    assert_eq!(stored.description, None, "omitted fields are cleared on update");
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_record() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    let pending = uow.repository::<CourseCategory>().add(new_category("Art"))?;
    uow.commit().await?;
    let category = pending.into_committed()?;

    let mut uow = UnitOfWork::new(db.pool.clone());
    let loaded = uow
        .repository::<CourseCategory>()
        .get_one(json!({ "id": category.id }), &[])
        .await?
        .expect("category exists");
    assert!(uow.is_tracked::<CourseCategory>(category.id));
    uow.repository::<CourseCategory>().delete(loaded.entity())?;
    assert!(!uow.is_tracked::<CourseCategory>(category.id));
    uow.commit().await?;

    let mut reader = UnitOfWork::new(db.pool.clone());
    let gone = reader
        .repository::<CourseCategory>()
        .get_one(json!({ "id": category.id }), &[])
        .await?;
    assert!(gone.is_none());
    Ok(())
}

#[tokio::test]
async fn no_tracking_reads_stay_out_of_the_identity_map() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    let pending = uow.repository::<CourseCategory>().add(new_category("Science"))?;
    uow.commit().await?;
    let id = pending.into_committed()?.id;

    let mut uow = UnitOfWork::new(db.pool.clone());
    let mut loaded = uow
        .repository::<CourseCategory>()
        .query(Some(QuerySpec::new().predicate(json!({ "id": id })).no_tracking()))
        .fetch_optional()
        .await?
        .expect("category exists")
        .into_inner();
    assert!(!uow.is_tracked::<CourseCategory>(id));

    // Mutating a detached copy stages nothing
    loaded.name = "Changed".to_string();
    assert_eq!(uow.pending(), 0);
    assert_eq!(uow.commit().await?, 0);

    let mut reader = UnitOfWork::new(db.pool.clone());
    let stored = reader
        .repository::<CourseCategory>()
        .get_one(json!({ "id": id }), &[])
        .await?
        .expect("category exists");
    assert_eq!(stored.name, "Science");
    Ok(())
}

#[tokio::test]
async fn tracked_version_wins_over_a_fresh_read() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    let pending = uow.repository::<CourseCategory>().add(new_category("History"))?;
    uow.commit().await?;
    let category = pending.into_committed()?;

    let mut uow = UnitOfWork::new(db.pool.clone());
    uow.repository::<CourseCategory>().update(CourseCategory {
        name: "World History".to_string(),
        ..category.clone()
    })?;

    let reread = uow
        .repository::<CourseCategory>()
        .get_one(json!({ "id": category.id }), &[])
        .await?
        .expect("category exists");
    assert_eq!(reread.name, "World History", "staged update is visible within the unit of work");
    Ok(())
}

#[tokio::test]
async fn pagination_walks_every_page() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    for i in 0..25 {
        uow.repository::<CourseCategory>().add(new_category(&format!("Category {:02}", i)))?;
    }
    assert_eq!(uow.commit().await?, 25);

    let mut sizes = Vec::new();
    let mut first_names = Vec::new();
    for page_index in 1..=4 {
        let page = uow
            .repository::<CourseCategory>()
            .query(Some(QuerySpec::new().no_tracking()))
            .to_page(&PaginationParams::new(page_index, 10))
            .await?;
        assert_eq!(page.meta.total_count, 25);
        assert_eq!(page.meta.total_pages, 3);
        sizes.push(page.items.len());
        first_names.push(page.items.first().map(|c| c.name.clone()));
    }

    assert_eq!(sizes, vec![10, 10, 5, 0]);
    assert_eq!(first_names[0].as_deref(), Some("Category 00"));
    assert_eq!(first_names[1].as_deref(), Some("Category 10"));
    assert_eq!(first_names[2].as_deref(), Some("Category 20"));
    assert_eq!(first_names[3], None);
    Ok(())
}

#[tokio::test]
async fn filters_and_ordering_compose() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    for name in ["Algebra", "Biology", "Chemistry", "Drawing"] {
        uow.repository::<CourseCategory>().add(new_category(name))?;
    }
    uow.commit().await?;

    let names: Vec<String> = uow
        .repository::<CourseCategory>()
        .query(Some(QuerySpec::new().predicate(json!({ "name": { "$in": ["Algebra", "Biology", "Drawing"] } }))))
        .filter(json!({ "name": { "$ne": "Biology" } }))
        .order_by("name desc")
        .fetch_all()
        .await?
        .into_iter()
        .map(|c| c.into_inner().name)
        .collect();
    assert_eq!(names, vec!["Drawing", "Algebra"]);

    let skipped: Vec<String> = uow
        .repository::<CourseCategory>()
        .query(None)
        .skip(1)
        .take(2)
        .fetch_all()
        .await?
        .into_iter()
        .map(|c| c.into_inner().name)
        .collect();
    assert_eq!(skipped, vec!["Biology", "Chemistry"]);

    let like = uow
        .repository::<CourseCategory>()
        .query(Some(QuerySpec::new().predicate(json!({ "name": { "$like": "%ing" } }))))
        .count()
        .await?;
    assert_eq!(like, 1);
    Ok(())
}

#[tokio::test]
async fn failed_commit_applies_nothing_and_poisons_the_unit_of_work() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    let first = uow.repository::<CourseCategory>().add(new_category("Physics"))?;
    uow.repository::<CourseCategory>().add(new_category("Math"))?;
    uow.repository::<CourseCategory>().add(new_category("Physics"))?;

    let err = uow.commit().await.expect_err("duplicate name must fail");
    assert!(err.is_unique_violation(), "unexpected error: {}", err);
    assert_eq!(first.id(), None, "no identity is published for a rolled back insert");
    assert_eq!(uow.state(), UnitOfWorkState::Failed);

    let mut reader = UnitOfWork::new(db.pool.clone());
    assert_eq!(reader.repository::<CourseCategory>().query(None).count().await?, 0);

    assert!(matches!(
        uow.repository::<CourseCategory>().add(new_category("Later")),
        Err(DatabaseError::UnitOfWorkFailed)
    ));
    assert!(matches!(
        uow.repository::<CourseCategory>().query(None).fetch_all().await,
        Err(DatabaseError::UnitOfWorkFailed)
    ));
    assert!(matches!(uow.commit().await, Err(DatabaseError::UnitOfWorkFailed)));
    Ok(())
}

#[tokio::test]
async fn update_of_missing_record_fails_at_commit() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    let mut ghost = new_user("ghost");
    ghost.id = 9_999;

    uow.repository::<User>().update(ghost)?;
    let err = uow.commit().await.expect_err("no row to update");
    assert!(matches!(err, DatabaseError::NotFound { table: "users", id: 9_999 }));
    Ok(())
}

#[tokio::test]
async fn delete_of_missing_record_fails_at_commit() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    let mut ghost = new_category("Ghost");
    ghost.id = 4_242;

    uow.repository::<CourseCategory>().delete(&ghost)?;
    let err = uow.commit().await.expect_err("no row to delete");
    assert!(matches!(err, DatabaseError::NotFound { table: "course_categories", id: 4_242 }));
    assert_eq!(uow.state(), UnitOfWorkState::Failed);
    Ok(())
}

#[tokio::test]
async fn staged_mutations_apply_in_call_order() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    uow.repository::<CourseCategory>().add(new_category("History"))?;
    uow.repository::<CourseCategory>().add(new_category("Physics"))?;
    uow.commit().await?;

    // delete then re-add the same unique name
    let mut uow = UnitOfWork::new(db.pool.clone());
    let mut categories = uow.repository::<CourseCategory>();
    let history = categories
        .get_one(json!({ "name": "History" }), &[])
        .await?
        .expect("history exists")
        .into_inner();
    categories.delete(&history)?;
    let replacement = categories.add(new_category("History"))?;
    assert_eq!(categories.commit().await?, 2);
    assert_ne!(replacement.into_committed()?.id, history.id);

    // the reverse order collides on the unique name and applies nothing
    let mut uow = UnitOfWork::new(db.pool.clone());
    let mut categories = uow.repository::<CourseCategory>();
    let physics = categories
        .get_one(json!({ "name": "Physics" }), &[])
        .await?
        .expect("physics exists")
        .into_inner();
    categories.add(new_category("Physics"))?;
    categories.delete(&physics)?;
    let err = categories.commit().await.expect_err("insert runs before the delete");
    assert!(err.is_unique_violation(), "{}", err);

    let mut reader = UnitOfWork::new(db.pool.clone());
    let still_there = reader
        .repository::<CourseCategory>()
        .get_one(json!({ "name": "Physics" }), &[])
        .await?
        .expect("physics survives the failed commit");
    assert_eq!(still_there.id, physics.id);
    Ok(())
}

#[tokio::test]
async fn dropped_commit_leaves_the_unit_of_work_reusable() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());
    let pending = uow.repository::<CourseCategory>().add(new_category("Drama"))?;

    {
        let commit = uow.commit();
        tokio::pin!(commit);
        tokio::select! {
            biased;
            _ = &mut commit => {}
            _ = std::future::ready(()) => {}
        }
    }

    assert_eq!(uow.pending(), 0);
    assert_eq!(uow.commit().await?, 0);
    assert_eq!(uow.state(), UnitOfWorkState::Idle);

    // the transaction itself keeps running on its own task
    for _ in 0..50 {
        if pending.id().is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(pending.id().is_some(), "detached commit still lands");
    Ok(())
}

#[tokio::test]
async fn invalid_queries_fail_only_when_enumerated() -> Result<()> {
    let db = test_db().await?;
    let mut uow = UnitOfWork::new(db.pool.clone());

    let mut categories = uow.repository::<CourseCategory>();
    let query = categories.query(Some(QuerySpec::new().predicate(json!({ "name; DROP TABLE users": 1 }))));
    assert!(query.spec().predicate.is_some(), "building the query succeeds");
    assert!(matches!(query.fetch_all().await, Err(DatabaseError::InvalidQuery(_))));

    let unknown = uow
        .repository::<Course>()
        .query(Some(QuerySpec::new().include("publisher")))
        .fetch_all()
        .await;
    assert!(matches!(unknown, Err(DatabaseError::UnknownInclude(path)) if path == "publisher"));
    Ok(())
}

#[tokio::test]
async fn concurrent_units_of_work_do_not_interfere() -> Result<()> {
    let db = test_db().await?;

    let mut handles = Vec::new();
    for i in 0..8 {
        let pool = db.pool.clone();
        handles.push(tokio::spawn(async move {
            let mut uow = UnitOfWork::new(pool);
            let pending = uow.repository::<CourseCategory>().add(new_category(&format!("Parallel {}", i)))?;
            uow.commit().await?;
            pending.into_committed()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await??.id);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    let mut reader = UnitOfWork::new(db.pool.clone());
    assert_eq!(reader.repository::<CourseCategory>().query(None).count().await?, 8);
    Ok(())
}

#[tokio::test]
async fn includes_load_related_records() -> Result<()> {
    let db = test_db().await?;
    let (author_id, category_id) = seed_author_and_category(&db.pool).await?;

    let mut uow = UnitOfWork::new(db.pool.clone());
    let course = uow.repository::<Course>().add(new_course("Rust", author_id, category_id))?;
    let empty = uow.repository::<Course>().add(new_course("Go", author_id, category_id))?;
    uow.commit().await?;
    let course = course.into_committed()?;
    let empty = empty.into_committed()?;

    for name in ["Ownership", "Lifetimes"] {
        uow.repository::<CourseTarget>().add(CourseTarget {
            id: UNASSIGNED_ID,
            course_id: course.id,
            name: name.to_string(),
            created_at: timestamp(),
        })?;
    }
    uow.commit().await?;

    let mut reader = UnitOfWork::new(db.pool.clone());
    let courses = reader
        .repository::<Course>()
        .query(Some(QuerySpec::new().includes(["author", "category", "targets", "image"])))
        .fetch_all()
        .await?;
    assert_eq!(courses.len(), 2);

    let rust = &courses[0];
    let author: User = rust.related("author")?.expect("author loaded");
    assert_eq!(author.id, author_id);
    let category: CourseCategory = rust.related("category")?.expect("category loaded");
    assert_eq!(category.name, "Programming");
    let targets: Vec<CourseTarget> = rust.related_many("targets")?;
    assert_eq!(targets.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["Ownership", "Lifetimes"]);
    assert!(rust.related::<Attachment>("image")?.is_none());

    assert_eq!(courses[1].id, empty.id);
    assert!(courses[1].related_many::<CourseTarget>("targets")?.is_empty());

    let plain = reader
        .repository::<Course>()
        .get_one(json!({ "id": course.id }), &[])
        .await?
        .expect("course exists");
    assert!(plain.related_value("author").is_none(), "relations are only loaded when requested");
    Ok(())
}

#[tokio::test]
async fn nested_includes_follow_dotted_paths() -> Result<()> {
    let db = test_db().await?;
    let (author_id, category_id) = seed_author_and_category(&db.pool).await?;

    let mut uow = UnitOfWork::new(db.pool.clone());
    let course = uow.repository::<Course>().add(new_course("Rust", author_id, category_id))?;
    let file = uow.repository::<Attachment>().add(Attachment {
        id: UNASSIGNED_ID,
        name: "diagram.png".to_string(),
        path: "zamin/diagram.png".to_string(),
        content_type: Some("image/png".to_string()),
        size: 42,
        created_at: timestamp(),
    })?;
    let content = uow.repository::<QuizContent>().add(QuizContent {
        id: UNASSIGNED_ID,
        question: "What does the borrow checker enforce?".to_string(),
        created_at: timestamp(),
    })?;
    uow.commit().await?;
    let (course, file, content) = (course.into_committed()?, file.into_committed()?, content.into_committed()?);

    uow.repository::<QuizAsset>().add(QuizAsset {
        id: UNASSIGNED_ID,
        quiz_content_id: content.id,
        file_id: file.id,
        created_at: timestamp(),
    })?;
    let quiz = uow.repository::<Quiz>().add(Quiz {
        id: UNASSIGNED_ID,
        course_id: course.id,
        quiz_content_id: content.id,
        created_at: timestamp(),
    })?;
    uow.commit().await?;
    let quiz = quiz.into_committed()?;

    for (answer, is_correct) in [("Aliasing rules", true), ("Indentation", false)] {
        uow.repository::<QuestionAnswer>().add(QuestionAnswer {
            id: UNASSIGNED_ID,
            quiz_id: quiz.id,
            answer: answer.to_string(),
            is_correct,
            created_at: timestamp(),
        })?;
    }
    uow.commit().await?;

    let mut reader = UnitOfWork::new(db.pool.clone());
    let loaded = reader
        .repository::<Quiz>()
        .get_one(json!({ "id": quiz.id }), &["content.assets.file", "answers", "course"])
        .await?
        .expect("quiz exists");

    let content_json = loaded.related_value("content").expect("content loaded");
    assert_eq!(content_json["question"], "What does the borrow checker enforce?");
    assert_eq!(content_json["assets"][0]["file"]["name"], "diagram.png");

    let answers: Vec<QuestionAnswer> = loaded.related_many("answers")?;
    assert_eq!(answers.len(), 2);
    assert_eq!(answers.iter().filter(|a| a.is_correct).count(), 1);

    let course_back: Course = loaded.related("course")?.expect("course loaded");
    assert_eq!(course_back.id, course.id);
    Ok(())
}
