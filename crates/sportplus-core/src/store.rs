//! The `ContentStore` and `ProgressStore` traits.
//!
//! Both are implemented by storage backends (e.g. `sportplus-store-sqlite`).
//! The progress engine is generic over them and never sees a connection.

use std::future::Future;

use crate::{
  content::{ClassPath, Course, ExercisePath, LessonPath},
  id::{
    ClassId, ClassStatusId, ClientId, CourseId, CourseStatusId, ExerciseId,
    LessonId, LessonStatusId,
  },
  progress::{
    ClassStatus, ClassUpsert, ClientProgress, CourseStatus, CourseUpsert,
    ExerciseStatus, ExerciseUpsert, LessonStatus, LessonUpsert, StatusWrite,
  },
};

// ─── Content ─────────────────────────────────────────────────────────────────

/// Read-only access to the authoritative content tree.
pub trait ContentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// A course with its classes, lessons and exercises fully nested.
  fn get_course(
    &self,
    id: CourseId,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// Cheap existence check that does not load the course's children.
  fn course_exists(
    &self,
    id: CourseId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Every course, fully nested, ordered by id.
  fn list_courses(
    &self,
  ) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  fn locate_class(
    &self,
    id: ClassId,
  ) -> impl Future<Output = Result<Option<ClassPath>, Self::Error>> + Send + '_;

  fn locate_lesson(
    &self,
    id: LessonId,
  ) -> impl Future<Output = Result<Option<LessonPath>, Self::Error>> + Send + '_;

  /// Returns `None` unless `exercise` is attached to `lesson`.
  fn locate_exercise(
    &self,
    lesson: LessonId,
    exercise: ExerciseId,
  ) -> impl Future<Output = Result<Option<ExercisePath>, Self::Error>> + Send + '_;
}

// ─── Progress ────────────────────────────────────────────────────────────────

/// Durable storage for per-client progress trees.
///
/// Reads return whole subtrees. Writes touch exactly one node and are
/// expressed as a [`StatusWrite`]; at most one node exists per
/// (parent key, content id) at each level, and a concurrent second writer
/// resolves against the existing row instead of inserting a duplicate.
///
/// An absent node is `Ok(None)`, never an error.
pub trait ProgressStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the client's full tree, persisting an empty record on first
  /// access.
  fn get_or_create_client_progress(
    &self,
    client: ClientId,
  ) -> impl Future<Output = Result<ClientProgress, Self::Error>> + Send + '_;

  // ── Course level ──────────────────────────────────────────────────────

  fn get_course_status(
    &self,
    client: ClientId,
    course: CourseId,
  ) -> impl Future<Output = Result<Option<CourseStatus>, Self::Error>> + Send + '_;

  /// Write a course status. Creates the client record if it does not exist
  /// yet.
  fn upsert_course_status(
    &self,
    client: ClientId,
    course: CourseId,
    write: StatusWrite,
  ) -> impl Future<Output = Result<CourseUpsert, Self::Error>> + Send + '_;

  // ── Class level ───────────────────────────────────────────────────────

  fn get_class_status(
    &self,
    parent: CourseStatusId,
    class: ClassId,
  ) -> impl Future<Output = Result<Option<ClassStatus>, Self::Error>> + Send + '_;

  fn upsert_class_status(
    &self,
    parent: CourseStatusId,
    class: ClassId,
    write: StatusWrite,
  ) -> impl Future<Output = Result<ClassUpsert, Self::Error>> + Send + '_;

  // ── Lesson level ──────────────────────────────────────────────────────

  fn get_lesson_status(
    &self,
    parent: ClassStatusId,
    lesson: LessonId,
  ) -> impl Future<Output = Result<Option<LessonStatus>, Self::Error>> + Send + '_;

  fn upsert_lesson_status(
    &self,
    parent: ClassStatusId,
    lesson: LessonId,
    write: StatusWrite,
  ) -> impl Future<Output = Result<LessonUpsert, Self::Error>> + Send + '_;

  // ── Exercise level ────────────────────────────────────────────────────

  fn get_exercise_status(
    &self,
    parent: LessonStatusId,
    exercise: ExerciseId,
  ) -> impl Future<Output = Result<Option<ExerciseStatus>, Self::Error>> + Send + '_;

  fn upsert_exercise_status(
    &self,
    parent: LessonStatusId,
    exercise: ExerciseId,
    write: StatusWrite,
  ) -> impl Future<Output = Result<ExerciseUpsert, Self::Error>> + Send + '_;
}
