//! Explicit status changes.
//!
//! A mutation resolves the target's ancestor chain from the content store,
//! backfills any missing ancestor status node at `NotStarted`, and sets the
//! target. It never touches siblings or children and never reconciles.

use serde::Serialize;
use sportplus_core::{
  Status,
  id::{ClassId, ClassStatusId, ClientId, CourseId, CourseStatusId, LessonId, LessonStatusId},
  progress::{
    ClassUpsert, CourseUpsert, ExerciseUpsert, LessonUpsert, StatusTarget, StatusWrite,
  },
  store::{ContentStore, ProgressStore},
};
use tracing::debug;

use crate::{Error, Result};

/// The node a mutation wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Updated {
  Course(CourseUpsert),
  Class(ClassUpsert),
  Lesson(LessonUpsert),
  Exercise(ExerciseUpsert),
}

impl Updated {
  pub fn status(&self) -> Status {
    match self {
      Self::Course(u) => u.status,
      Self::Class(u) => u.status,
      Self::Lesson(u) => u.status,
      Self::Exercise(u) => u.status,
    }
  }

  /// `false` if the node already had the requested status.
  pub fn changed(&self) -> bool {
    match self {
      Self::Course(u) => u.changed,
      Self::Class(u) => u.changed,
      Self::Lesson(u) => u.changed,
      Self::Exercise(u) => u.changed,
    }
  }
}

/// Set the status of the node at `target` for `client`.
///
/// Content is validated before anything is written: an unknown target fails
/// with [`Error::UnknownContent`], and a target whose parent id does not match
/// the content hierarchy fails with [`Error::InvalidIdentifier`].
pub async fn set_status<P, C>(
  progress: &P,
  content: &C,
  client: ClientId,
  target: StatusTarget,
  status: Status,
) -> Result<Updated>
where
  P: ProgressStore,
  C: ContentStore,
{
  let updated = match target {
    StatusTarget::Course { course } => {
      if !content.course_exists(course).await.map_err(Error::content)? {
        return Err(Error::UnknownContent(format!("course {course}")));
      }
      Updated::Course(
        progress
          .upsert_course_status(client, course, StatusWrite::Set(status))
          .await
          .map_err(Error::store)?,
      )
    }

    StatusTarget::Class { course, class } => {
      let path = content
        .locate_class(class)
        .await
        .map_err(Error::content)?
        .ok_or_else(|| Error::UnknownContent(format!("class {class}")))?;
      if path.course != course {
        return Err(Error::InvalidIdentifier(format!(
          "class {class} does not belong to course {course}"
        )));
      }
      let parent = course_key(progress, client, path.course).await?;
      Updated::Class(
        progress
          .upsert_class_status(parent, class, StatusWrite::Set(status))
          .await
          .map_err(Error::store)?,
      )
    }

    StatusTarget::Lesson { class, lesson } => {
      let path = content
        .locate_lesson(lesson)
        .await
        .map_err(Error::content)?
        .ok_or_else(|| Error::UnknownContent(format!("lesson {lesson}")))?;
      if path.class != class {
        return Err(Error::InvalidIdentifier(format!(
          "lesson {lesson} does not belong to class {class}"
        )));
      }
      let course = course_key(progress, client, path.course).await?;
      let parent = class_key(progress, course, path.class).await?;
      Updated::Lesson(
        progress
          .upsert_lesson_status(parent, lesson, StatusWrite::Set(status))
          .await
          .map_err(Error::store)?,
      )
    }

    StatusTarget::Exercise { lesson, exercise } => {
      let path = content
        .locate_exercise(lesson, exercise)
        .await
        .map_err(Error::content)?
        .ok_or_else(|| {
          Error::UnknownContent(format!("exercise {exercise} in lesson {lesson}"))
        })?;
      let course = course_key(progress, client, path.course).await?;
      let class = class_key(progress, course, path.class).await?;
      let parent = lesson_key(progress, class, path.lesson).await?;
      Updated::Exercise(
        progress
          .upsert_exercise_status(parent, exercise, StatusWrite::Set(status))
          .await
          .map_err(Error::store)?,
      )
    }
  };

  debug!(
    %client,
    level = target.level(),
    status = %updated.status(),
    changed = updated.changed(),
    "status set"
  );
  Ok(updated)
}

// Ancestors are backfilled, so an ancestor set concurrently by another
// request keeps its status.

async fn course_key<P: ProgressStore>(
  progress: &P,
  client: ClientId,
  course: CourseId,
) -> Result<CourseStatusId> {
  Ok(
    progress
      .upsert_course_status(client, course, StatusWrite::Backfill)
      .await
      .map_err(Error::store)?
      .key,
  )
}

async fn class_key<P: ProgressStore>(
  progress: &P,
  parent: CourseStatusId,
  class: ClassId,
) -> Result<ClassStatusId> {
  Ok(
    progress
      .upsert_class_status(parent, class, StatusWrite::Backfill)
      .await
      .map_err(Error::store)?
      .key,
  )
}

async fn lesson_key<P: ProgressStore>(
  progress: &P,
  parent: ClassStatusId,
  lesson: LessonId,
) -> Result<LessonStatusId> {
  Ok(
    progress
      .upsert_lesson_status(parent, lesson, StatusWrite::Backfill)
      .await
      .map_err(Error::store)?
      .key,
  )
}
