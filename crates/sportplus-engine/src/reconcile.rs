//! Structure reconciliation: walk the content tree and make sure the client
//! has a status node for every content node in it.
//!
//! Nodes are matched to content by content id, never by position. Missing
//! nodes are written with [`StatusWrite::Backfill`], so a node an explicit
//! mutation created in the meantime is never overwritten. Existing nodes are
//! never modified, including those whose content has since disappeared;
//! those are reported as [`BrokenReference`]s and left in place.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sportplus_core::{
  content::{Class, Course, Lesson},
  id::{
    ClassId, ClassStatusId, ClientId, CourseId, CourseStatusId, ExerciseId, LessonId,
    LessonStatusId,
  },
  progress::{ClassStatus, ClientProgress, CourseStatus, LessonStatus, StatusWrite},
  store::ProgressStore,
};
use tracing::{debug, warn};

use crate::{Error, Result, error::BoxError};

// ─── Report ──────────────────────────────────────────────────────────────────

/// A status node whose content counterpart no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum BrokenReference {
  Course { course: CourseId },
  Class { course: CourseId, class: ClassId },
  Lesson { class: ClassId, lesson: LessonId },
  Exercise { lesson: LessonId, exercise: ExerciseId },
}

/// What one reconciliation pass did.
#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
  /// Status nodes created by this pass.
  pub inserted: usize,
  pub broken:   Vec<BrokenReference>,
  #[serde(skip)]
  failures:     Vec<BranchFailure>,
}

#[derive(Debug)]
struct BranchFailure {
  branch: String,
  error:  BoxError,
}

impl ReconcileReport {
  pub fn is_clean(&self) -> bool { self.broken.is_empty() && self.failures.is_empty() }

  /// Turn the report into an error if any branch was abandoned. Writes made
  /// for the other branches stay committed.
  pub(crate) fn into_result(mut self) -> Result<Self> {
    if self.failures.is_empty() {
      return Ok(self);
    }
    let failed = self.failures.len();
    let first = self.failures.swap_remove(0);
    Err(Error::Store(
      format!(
        "reconciliation abandoned {failed} branch(es); first: {}: {}",
        first.branch, first.error
      )
      .into(),
    ))
  }
}

/// A reconciled tree together with the report of the pass that produced it.
#[derive(Debug, Serialize)]
pub struct Reconciled<T> {
  pub progress: T,
  pub report:   ReconcileReport,
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

/// One reconciliation pass over a progress store.
///
/// The pass never stops at the first error: a failing course, class or lesson
/// abandons that branch, is recorded, and its siblings are still visited.
pub struct Reconciler<'a, P> {
  store:  &'a P,
  report: ReconcileReport,
}

impl<'a, P: ProgressStore> Reconciler<'a, P> {
  pub fn new(store: &'a P) -> Self { Self { store, report: ReconcileReport::default() } }

  pub fn finish(self) -> ReconcileReport { self.report }

  /// Reconcile every course in `courses` against the client's tree.
  pub async fn client(&mut self, existing: &ClientProgress, courses: &[Course]) {
    let index: HashMap<CourseId, &CourseStatus> =
      existing.courses.iter().map(|c| (c.course_id, c)).collect();
    let known: HashSet<CourseId> = courses.iter().map(|c| c.id).collect();

    for node in &existing.courses {
      if !known.contains(&node.course_id) {
        self.broken(BrokenReference::Course { course: node.course_id });
      }
    }

    for course in courses {
      self
        .course(existing.client_id, course, index.get(&course.id).copied())
        .await;
    }
  }

  /// Record a course status node whose course is gone from content.
  pub fn stale_course(&mut self, course: CourseId) {
    self.broken(BrokenReference::Course { course });
  }

  /// Reconcile one course. Failures are recorded in the report rather than
  /// returned.
  pub async fn course(
    &mut self,
    client: ClientId,
    course: &Course,
    existing: Option<&CourseStatus>,
  ) {
    if let Err(e) = self.reconcile_course(client, course, existing).await {
      self.fail(format!("course {}", course.id), e);
    }
  }

  async fn reconcile_course(
    &mut self,
    client: ClientId,
    course: &Course,
    existing: Option<&CourseStatus>,
  ) -> Result<(), P::Error> {
    let key: CourseStatusId = match existing {
      Some(node) => node.key,
      None => {
        let up = self
          .store
          .upsert_course_status(client, course.id, StatusWrite::Backfill)
          .await?;
        self.inserted(up.changed);
        up.key
      }
    };

    let index: HashMap<ClassId, &ClassStatus> = existing
      .map(|n| n.classes.iter().map(|c| (c.class_id, c)).collect())
      .unwrap_or_default();
    let known: HashSet<ClassId> = course.classes.iter().map(|c| c.id).collect();
    for &class in index.keys().filter(|id| !known.contains(*id)) {
      self.broken(BrokenReference::Class { course: course.id, class });
    }

    for class in &course.classes {
      if let Err(e) = self.reconcile_class(key, class, index.get(&class.id).copied()).await {
        self.fail(format!("class {}", class.id), e);
      }
    }
    Ok(())
  }

  async fn reconcile_class(
    &mut self,
    parent: CourseStatusId,
    class: &Class,
    existing: Option<&ClassStatus>,
  ) -> Result<(), P::Error> {
    let key: ClassStatusId = match existing {
      Some(node) => node.key,
      None => {
        let up = self
          .store
          .upsert_class_status(parent, class.id, StatusWrite::Backfill)
          .await?;
        self.inserted(up.changed);
        up.key
      }
    };

    let index: HashMap<LessonId, &LessonStatus> = existing
      .map(|n| n.lessons.iter().map(|l| (l.lesson_id, l)).collect())
      .unwrap_or_default();
    let known: HashSet<LessonId> = class.lessons.iter().map(|l| l.id).collect();
    for &lesson in index.keys().filter(|id| !known.contains(*id)) {
      self.broken(BrokenReference::Lesson { class: class.id, lesson });
    }

    for lesson in &class.lessons {
      if let Err(e) = self.reconcile_lesson(key, lesson, index.get(&lesson.id).copied()).await {
        self.fail(format!("lesson {}", lesson.id), e);
      }
    }
    Ok(())
  }

  async fn reconcile_lesson(
    &mut self,
    parent: ClassStatusId,
    lesson: &Lesson,
    existing: Option<&LessonStatus>,
  ) -> Result<(), P::Error> {
    let key: LessonStatusId = match existing {
      Some(node) => node.key,
      None => {
        let up = self
          .store
          .upsert_lesson_status(parent, lesson.id, StatusWrite::Backfill)
          .await?;
        self.inserted(up.changed);
        up.key
      }
    };

    let present: HashSet<ExerciseId> = existing
      .map(|n| n.exercises.iter().map(|e| e.exercise_id).collect())
      .unwrap_or_default();
    let known: HashSet<ExerciseId> = lesson.exercises.iter().map(|e| e.id).collect();
    for &exercise in present.iter().filter(|id| !known.contains(*id)) {
      self.broken(BrokenReference::Exercise { lesson: lesson.id, exercise });
    }

    let missing: Vec<ExerciseId> = lesson
      .exercises
      .iter()
      .map(|e| e.id)
      .filter(|id| !present.contains(id))
      .collect();
    for exercise in missing {
      let up = self
        .store
        .upsert_exercise_status(key, exercise, StatusWrite::Backfill)
        .await?;
      self.inserted(up.changed);
    }
    Ok(())
  }

  fn inserted(&mut self, changed: bool) {
    if changed {
      self.report.inserted += 1;
    }
  }

  fn broken(&mut self, reference: BrokenReference) {
    warn!(?reference, "status node refers to content that no longer exists");
    self.report.broken.push(reference);
  }

  fn fail(&mut self, branch: String, error: P::Error) {
    warn!(%branch, %error, "abandoning reconciliation branch");
    self.report.failures.push(BranchFailure { branch, error: Box::new(error) });
  }
}

/// Log the outcome of a finished pass.
pub(crate) fn log_report(client: ClientId, report: &ReconcileReport) {
  if report.inserted > 0 {
    debug!(%client, inserted = report.inserted, "backfilled progress nodes");
  }
}
