//! Engine behaviour against the SQLite backend.

use sportplus_core::{
  Status,
  content::{ContentImport, Exercise, ImportClass, ImportCourse, ImportLesson},
  id::{ClassId, ClientId, CourseId, ExerciseId, LessonId},
  progress::{CourseStatus, StatusTarget, StatusWrite},
  store::ProgressStore,
};
use sportplus_store_sqlite::SqliteStore;

use crate::{BrokenReference, Error, ProgressEngine};

type Engine = ProgressEngine<SqliteStore, SqliteStore>;

fn client(id: i64) -> ClientId { ClientId::new(id).unwrap() }
fn course(id: i64) -> CourseId { CourseId::new(id).unwrap() }
fn class(id: i64) -> ClassId { ClassId::new(id).unwrap() }
fn lesson(id: i64) -> LessonId { LessonId::new(id).unwrap() }
fn exercise(id: i64) -> ExerciseId { ExerciseId::new(id).unwrap() }

/// Course 1 → class 10 → lesson 100 → exercises 1001, 1002.
async fn engine() -> (Engine, SqliteStore) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .import_content(ContentImport {
      exercises: vec![
        Exercise { id: exercise(1001), name: "Squat".into() },
        Exercise { id: exercise(1002), name: "Lunge".into() },
      ],
      courses:   vec![ImportCourse {
        id:          course(1),
        title:       "Strength basics".into(),
        description: None,
        classes:     vec![ImportClass {
          id:      class(10),
          title:   "Week 1".into(),
          lessons: vec![ImportLesson {
            id:        lesson(100),
            title:     "Legs".into(),
            exercises: vec![exercise(1001), exercise(1002)],
          }],
        }],
      }],
    })
    .await
    .unwrap();
  (ProgressEngine::new(store.clone(), store.clone()), store)
}

/// Course 1 → class 10 → lessons 100 (1001), 101 (1002);
/// class 20 → lesson 200 (1003).
fn wide_import() -> ContentImport {
  let lesson_with = |id, title: &str, ex| ImportLesson {
    id:        lesson(id),
    title:     title.into(),
    exercises: vec![exercise(ex)],
  };
  ContentImport {
    exercises: vec![
      Exercise { id: exercise(1001), name: "Squat".into() },
      Exercise { id: exercise(1002), name: "Lunge".into() },
      Exercise { id: exercise(1003), name: "Plank".into() },
    ],
    courses:   vec![ImportCourse {
      id:          course(1),
      title:       "Strength basics".into(),
      description: None,
      classes:     vec![
        ImportClass {
          id:      class(10),
          title:   "Week 1".into(),
          lessons: vec![lesson_with(100, "Legs", 1001), lesson_with(101, "More legs", 1002)],
        },
        ImportClass {
          id:      class(20),
          title:   "Week 2".into(),
          lessons: vec![lesson_with(200, "Core", 1003)],
        },
      ],
    }],
  }
}

async fn wide_engine() -> (Engine, SqliteStore) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store.import_content(wide_import()).await.unwrap();
  (ProgressEngine::new(store.clone(), store.clone()), store)
}

fn exercise_status(tree: &CourseStatus, id: i64) -> Option<Status> {
  tree
    .class(class(10))?
    .lesson(lesson(100))?
    .exercise(exercise(id))
    .map(|e| e.status)
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn reconcile_backfills_every_node_at_not_started() {
  let (engine, _) = engine().await;
  let out = engine.course_progress(client(7), course(1)).await.unwrap();

  assert_eq!(out.report.inserted, 5);
  assert!(out.report.is_clean());

  let tree = out.progress;
  assert_eq!(tree.node_count(), 5);
  assert_eq!(tree.status, Status::NotStarted);
  let class_node = tree.class(class(10)).unwrap();
  assert_eq!(class_node.status, Status::NotStarted);
  let lesson_node = class_node.lesson(lesson(100)).unwrap();
  assert_eq!(lesson_node.status, Status::NotStarted);
  assert!(lesson_node.exercises.iter().all(|e| e.status == Status::NotStarted));
}

#[tokio::test]
async fn second_reconcile_writes_nothing() {
  let (engine, _) = engine().await;
  let first = engine.full_progress(client(7)).await.unwrap();
  let second = engine.full_progress(client(7)).await.unwrap();

  assert_eq!(first.report.inserted, 5);
  assert_eq!(second.report.inserted, 0);
  assert_eq!(first.progress, second.progress);
}

#[tokio::test]
async fn full_progress_covers_untouched_courses() {
  let (engine, store) = engine().await;
  let empty = store.add_course("Mobility", None).await.unwrap();

  let out = engine.full_progress(client(7)).await.unwrap();
  let ids: Vec<_> = out.progress.courses.iter().map(|c| c.course_id).collect();
  assert_eq!(ids, vec![course(1), empty.id]);
  assert!(out.progress.course(empty.id).unwrap().classes.is_empty());
}

#[tokio::test]
async fn course_progress_for_unknown_course_is_not_found() {
  let (engine, store) = engine().await;
  let err = engine.course_progress(client(7), course(99)).await.unwrap_err();
  assert!(matches!(err, Error::CourseNotFound(id) if id == course(99)));
  assert!(store.get_course_status(client(7), course(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn reconcile_picks_up_new_content_and_keeps_existing_status() {
  let (engine, store) = engine().await;

  engine
    .set_exercise_status(client(7), lesson(100), exercise(1001), Status::Completed)
    .await
    .unwrap();

  let tree = engine.course_progress(client(7), course(1)).await.unwrap().progress;
  assert_eq!(exercise_status(&tree, 1001), Some(Status::Completed));
  assert_eq!(exercise_status(&tree, 1002), Some(Status::NotStarted));

  let added = store.add_exercise("Deadlift").await.unwrap();
  store.attach_exercise(lesson(100), added.id).await.unwrap();

  let out = engine.course_progress(client(7), course(1)).await.unwrap();
  assert_eq!(out.report.inserted, 1);
  let tree = out.progress;
  assert_eq!(exercise_status(&tree, 1001), Some(Status::Completed));
  assert_eq!(exercise_status(&tree, 1002), Some(Status::NotStarted));
  assert_eq!(
    exercise_status(&tree, added.id.get()),
    Some(Status::NotStarted)
  );
  assert_eq!(tree.node_count(), 6);
}

#[tokio::test]
async fn stale_nodes_are_reported_and_kept() {
  let (engine, store) = engine().await;
  let tree = engine.course_progress(client(7), course(1)).await.unwrap().progress;
  let lesson_key = tree.class(class(10)).unwrap().lesson(lesson(100)).unwrap().key;

  store
    .upsert_exercise_status(lesson_key, exercise(4242), StatusWrite::Set(Status::Completed))
    .await
    .unwrap();
  store
    .upsert_course_status(client(7), course(77), StatusWrite::Backfill)
    .await
    .unwrap();

  let out = engine.full_progress(client(7)).await.unwrap();
  assert_eq!(out.report.inserted, 0);
  assert!(out.report.broken.contains(&BrokenReference::Course { course: course(77) }));
  assert!(out.report.broken.contains(&BrokenReference::Exercise {
    lesson:   lesson(100),
    exercise: exercise(4242),
  }));
  assert_eq!(out.report.broken.len(), 2);

  let kept = out.progress.course(course(1)).unwrap();
  assert_eq!(exercise_status(kept, 4242), Some(Status::Completed));
  assert!(out.progress.course(course(77)).is_some());
}

#[tokio::test]
async fn course_gone_from_content_returns_stored_progress() {
  let (engine, store) = engine().await;
  store
    .upsert_course_status(client(7), course(77), StatusWrite::Set(Status::InProgress))
    .await
    .unwrap();

  let out = engine.course_progress(client(7), course(77)).await.unwrap();
  assert_eq!(out.progress.course_id, course(77));
  assert_eq!(out.progress.status, Status::InProgress);
  assert_eq!(out.report.inserted, 0);
  assert_eq!(out.report.broken, vec![BrokenReference::Course { course: course(77) }]);

  let err = engine.course_progress(client(8), course(77)).await.unwrap_err();
  assert!(matches!(err, Error::CourseNotFound(_)));
}

#[tokio::test]
async fn reconcile_matches_nodes_by_id_not_position() {
  let (engine, _) = wide_engine().await;

  // Lesson 101 gets its row before lesson 100 exists, so stored order and
  // content order disagree.
  engine
    .set_lesson_status(client(7), class(10), lesson(101), Status::Completed)
    .await
    .unwrap();

  let out = engine.course_progress(client(7), course(1)).await.unwrap();
  assert_eq!(out.report.inserted, 6);
  let class_node = out.progress.class(class(10)).unwrap();
  assert_eq!(class_node.lessons[0].lesson_id, lesson(101));
  assert_eq!(class_node.lesson(lesson(101)).unwrap().status, Status::Completed);
  assert_eq!(class_node.lesson(lesson(100)).unwrap().status, Status::NotStarted);
  assert_eq!(out.progress.node_count(), 9);
}

#[tokio::test]
async fn failing_branch_is_abandoned_and_siblings_still_backfilled() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("progress.db");
  let store = SqliteStore::open(&path).await.unwrap();
  store.import_content(wide_import()).await.unwrap();

  let conn = rusqlite::Connection::open(&path).unwrap();
  conn
    .execute_batch(
      "CREATE TRIGGER reject_lesson_100 BEFORE INSERT ON lesson_statuses
       WHEN NEW.lesson_id = 100
       BEGIN SELECT RAISE(ABORT, 'lesson 100 rejected'); END;",
    )
    .unwrap();
  drop(conn);

  let engine = ProgressEngine::new(store.clone(), store.clone());
  let err = engine.course_progress(client(7), course(1)).await.unwrap_err();
  assert!(matches!(err, Error::Store(_)));
  assert!(err.is_transient());
  assert!(err.to_string().contains("lesson 100"));

  let tree = store.get_course_status(client(7), course(1)).await.unwrap().unwrap();
  assert_eq!(tree.classes.len(), 2);
  let class_node = tree.class(class(10)).unwrap();
  assert!(class_node.lesson(lesson(100)).is_none());
  assert!(class_node.lesson(lesson(101)).is_some());
  assert!(tree.class(class(20)).unwrap().lesson(lesson(200)).is_some());
  assert_eq!(tree.node_count(), 7);
}

// ─── Mutation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mutation_creates_only_the_ancestor_chain() {
  let (engine, _) = engine().await;
  let progress = engine
    .set_exercise_status(client(7), lesson(100), exercise(1001), Status::Completed)
    .await
    .unwrap();

  assert_eq!(progress.courses.len(), 1);
  let tree = &progress.courses[0];
  assert_eq!(tree.node_count(), 4);
  assert_eq!(tree.status, Status::NotStarted);
  assert_eq!(exercise_status(tree, 1001), Some(Status::Completed));
  assert_eq!(exercise_status(tree, 1002), None);
}

#[tokio::test]
async fn mutation_leaves_children_and_siblings_alone() {
  let (engine, _) = engine().await;
  engine.course_progress(client(7), course(1)).await.unwrap();
  engine
    .set_exercise_status(client(7), lesson(100), exercise(1001), Status::Completed)
    .await
    .unwrap();

  let progress = engine
    .set_course_status(client(7), course(1), Status::InProgress)
    .await
    .unwrap();
  let tree = progress.course(course(1)).unwrap();
  assert_eq!(tree.status, Status::InProgress);
  assert_eq!(tree.class(class(10)).unwrap().status, Status::NotStarted);
  assert_eq!(exercise_status(tree, 1001), Some(Status::Completed));
  assert_eq!(exercise_status(tree, 1002), Some(Status::NotStarted));
}

#[tokio::test]
async fn lesson_mutation_leaves_sibling_lessons_alone() {
  let (engine, _) = wide_engine().await;
  engine.course_progress(client(7), course(1)).await.unwrap();

  let progress = engine
    .set_lesson_status(client(7), class(10), lesson(101), Status::Completed)
    .await
    .unwrap();
  let tree = progress.course(course(1)).unwrap();
  let week1 = tree.class(class(10)).unwrap();
  assert_eq!(week1.status, Status::NotStarted);
  assert_eq!(week1.lesson(lesson(101)).unwrap().status, Status::Completed);
  assert_eq!(week1.lesson(lesson(100)).unwrap().status, Status::NotStarted);
  let week2 = tree.class(class(20)).unwrap();
  assert_eq!(week2.lesson(lesson(200)).unwrap().status, Status::NotStarted);
  assert_eq!(tree.node_count(), 9);
}

#[tokio::test]
async fn ancestors_keep_their_status() {
  let (engine, _) = engine().await;
  engine
    .set_class_status(client(7), course(1), class(10), Status::InProgress)
    .await
    .unwrap();
  let progress = engine
    .set_lesson_status(client(7), class(10), lesson(100), Status::Completed)
    .await
    .unwrap();

  let tree = progress.course(course(1)).unwrap();
  let class_node = tree.class(class(10)).unwrap();
  assert_eq!(class_node.status, Status::InProgress);
  assert_eq!(class_node.lesson(lesson(100)).unwrap().status, Status::Completed);
}

#[tokio::test]
async fn repeated_set_reports_no_change() {
  let (engine, _) = engine().await;
  let target = StatusTarget::Lesson { class: class(10), lesson: lesson(100) };
  let first = engine.set_status(client(7), target, Status::Completed).await.unwrap();
  let second = engine.set_status(client(7), target, Status::Completed).await.unwrap();
  assert!(first.changed());
  assert!(!second.changed());
  assert_eq!(second.status(), Status::Completed);
}

#[tokio::test]
async fn mismatched_parent_is_rejected_without_writes() {
  let (engine, store) = engine().await;

  let err = engine
    .set_class_status(client(7), course(2), class(10), Status::Completed)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidIdentifier(_)));

  let err = engine
    .set_lesson_status(client(7), class(11), lesson(100), Status::Completed)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidIdentifier(_)));

  assert!(store.get_course_status(client(7), course(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_content_is_rejected_without_writes() {
  let (engine, store) = engine().await;

  let err = engine
    .set_course_status(client(7), course(5), Status::Completed)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownContent(_)));

  let err = engine
    .set_exercise_status(client(7), lesson(100), exercise(9999), Status::Completed)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownContent(_)));
  assert!(!err.is_transient());

  let progress = store.get_or_create_client_progress(client(7)).await.unwrap();
  assert!(progress.courses.is_empty());
}

#[tokio::test]
async fn clients_do_not_share_progress() {
  let (engine, _) = engine().await;
  engine
    .set_course_status(client(7), course(1), Status::Completed)
    .await
    .unwrap();

  let other = engine.course_progress(client(8), course(1)).await.unwrap().progress;
  assert_eq!(other.status, Status::NotStarted);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn mutation_racing_reconcile_leaves_one_node_with_explicit_status() {
  for _ in 0..20 {
    let (engine, _) = engine().await;
    let (read, write) = tokio::join!(
      engine.course_progress(client(7), course(1)),
      engine.set_exercise_status(client(7), lesson(100), exercise(1002), Status::Completed),
    );
    read.unwrap();
    write.unwrap();

    let tree = engine.course_progress(client(7), course(1)).await.unwrap().progress;
    let lesson_node = tree.class(class(10)).unwrap().lesson(lesson(100)).unwrap();
    let matching: Vec<_> = lesson_node
      .exercises
      .iter()
      .filter(|e| e.exercise_id == exercise(1002))
      .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].status, Status::Completed);
    assert_eq!(tree.node_count(), 5);
  }
}
