//! [`ProgressEngine`]: the operations callers use.

use sportplus_core::{
  Status,
  id::{ClassId, ClientId, CourseId, ExerciseId, LessonId},
  progress::{ClientProgress, CourseStatus, StatusTarget},
  store::{ContentStore, ProgressStore},
};

use crate::{
  Error, Result,
  mutate::{self, Updated},
  reconcile::{Reconciled, Reconciler, log_report},
};

/// Progress reads and writes over a progress store `P` and a content store
/// `C`. Holds no state of its own beyond the two handles.
#[derive(Clone)]
pub struct ProgressEngine<P, C> {
  progress: P,
  content:  C,
}

impl<P, C> ProgressEngine<P, C>
where
  P: ProgressStore,
  C: ContentStore,
{
  pub fn new(progress: P, content: C) -> Self { Self { progress, content } }

  /// The client's whole tree, backfilled against every course in the content
  /// store. Creates the client record on first access.
  pub async fn full_progress(&self, client: ClientId) -> Result<Reconciled<ClientProgress>> {
    let existing = self
      .progress
      .get_or_create_client_progress(client)
      .await
      .map_err(Error::store)?;
    let courses = self.content.list_courses().await.map_err(Error::content)?;

    let mut reconciler = Reconciler::new(&self.progress);
    reconciler.client(&existing, &courses).await;
    let report = reconciler.finish();
    log_report(client, &report);
    let report = report.into_result()?;

    let progress = self
      .progress
      .get_or_create_client_progress(client)
      .await
      .map_err(Error::store)?;
    Ok(Reconciled { progress, report })
  }

  /// One course subtree, backfilled against the course's current content.
  ///
  /// Fails with [`Error::CourseNotFound`] only when the course exists neither
  /// in content nor in the client's progress.
  pub async fn course_progress(
    &self,
    client: ClientId,
    course: CourseId,
  ) -> Result<Reconciled<CourseStatus>> {
    let content = self
      .content
      .get_course(course)
      .await
      .map_err(Error::content)?;
    let existing = self
      .progress
      .get_course_status(client, course)
      .await
      .map_err(Error::store)?;

    // Progress recorded against a course that has since left the content
    // tree is returned as stored, flagged in the report.
    let Some(content) = content else {
      let progress = existing.ok_or(Error::CourseNotFound(course))?;
      let mut reconciler = Reconciler::new(&self.progress);
      reconciler.stale_course(course);
      return Ok(Reconciled { progress, report: reconciler.finish() });
    };

    let mut reconciler = Reconciler::new(&self.progress);
    reconciler.course(client, &content, existing.as_ref()).await;
    let report = reconciler.finish();
    log_report(client, &report);
    let report = report.into_result()?;

    let progress = self
      .progress
      .get_course_status(client, course)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| {
        Error::Store(format!("course status for course {course} missing after backfill").into())
      })?;
    Ok(Reconciled { progress, report })
  }

  pub async fn set_status(
    &self,
    client: ClientId,
    target: StatusTarget,
    status: Status,
  ) -> Result<Updated> {
    mutate::set_status(&self.progress, &self.content, client, target, status).await
  }

  pub async fn set_course_status(
    &self,
    client: ClientId,
    course: CourseId,
    status: Status,
  ) -> Result<ClientProgress> {
    self
      .set_and_read(client, StatusTarget::Course { course }, status)
      .await
  }

  pub async fn set_class_status(
    &self,
    client: ClientId,
    course: CourseId,
    class: ClassId,
    status: Status,
  ) -> Result<ClientProgress> {
    self
      .set_and_read(client, StatusTarget::Class { course, class }, status)
      .await
  }

  pub async fn set_lesson_status(
    &self,
    client: ClientId,
    class: ClassId,
    lesson: LessonId,
    status: Status,
  ) -> Result<ClientProgress> {
    self
      .set_and_read(client, StatusTarget::Lesson { class, lesson }, status)
      .await
  }

  pub async fn set_exercise_status(
    &self,
    client: ClientId,
    lesson: LessonId,
    exercise: ExerciseId,
    status: Status,
  ) -> Result<ClientProgress> {
    self
      .set_and_read(client, StatusTarget::Exercise { lesson, exercise }, status)
      .await
  }

  /// Apply a mutation and return the client's tree as stored, without
  /// reconciling it.
  async fn set_and_read(
    &self,
    client: ClientId,
    target: StatusTarget,
    status: Status,
  ) -> Result<ClientProgress> {
    self.set_status(client, target, status).await?;
    self
      .progress
      .get_or_create_client_progress(client)
      .await
      .map_err(Error::store)
  }
}
