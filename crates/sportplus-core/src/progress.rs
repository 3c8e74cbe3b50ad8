//! The progress tree: one status node per content node a client has touched.
//!
//! Each level is addressed by its parent's key plus the content id it
//! shadows. Status values are independent per level; nothing here aggregates
//! children into a parent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Status,
  id::{
    ClassId, ClassStatusId, ClientId, CourseId, CourseStatusId, ExerciseId,
    ExerciseStatusId, LessonId, LessonStatusId,
  },
};

// ─── Tree ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProgress {
  pub client_id:  ClientId,
  pub created_at: DateTime<Utc>,
  pub courses:    Vec<CourseStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStatus {
  pub key:        CourseStatusId,
  pub course_id:  CourseId,
  pub status:     Status,
  pub updated_at: DateTime<Utc>,
  pub classes:    Vec<ClassStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStatus {
  pub key:        ClassStatusId,
  pub class_id:   ClassId,
  pub status:     Status,
  pub updated_at: DateTime<Utc>,
  pub lessons:    Vec<LessonStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonStatus {
  pub key:        LessonStatusId,
  pub lesson_id:  LessonId,
  pub status:     Status,
  pub updated_at: DateTime<Utc>,
  pub exercises:  Vec<ExerciseStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStatus {
  pub key:         ExerciseStatusId,
  pub exercise_id: ExerciseId,
  pub status:      Status,
  pub updated_at:  DateTime<Utc>,
}

impl ClientProgress {
  pub fn course(&self, id: CourseId) -> Option<&CourseStatus> {
    self.courses.iter().find(|c| c.course_id == id)
  }
}

impl CourseStatus {
  pub fn class(&self, id: ClassId) -> Option<&ClassStatus> {
    self.classes.iter().find(|c| c.class_id == id)
  }

  /// Number of status nodes in this subtree, including the course itself.
  pub fn node_count(&self) -> usize {
    1 + self.classes.iter().map(ClassStatus::node_count).sum::<usize>()
  }
}

impl ClassStatus {
  pub fn lesson(&self, id: LessonId) -> Option<&LessonStatus> {
    self.lessons.iter().find(|l| l.lesson_id == id)
  }

  pub fn node_count(&self) -> usize {
    1 + self.lessons.iter().map(LessonStatus::node_count).sum::<usize>()
  }
}

impl LessonStatus {
  pub fn exercise(&self, id: ExerciseId) -> Option<&ExerciseStatus> {
    self.exercises.iter().find(|e| e.exercise_id == id)
  }

  pub fn node_count(&self) -> usize { 1 + self.exercises.len() }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// How a status node is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWrite {
  /// An explicit mutation: insert at this status, or overwrite the status of
  /// the existing node.
  Set(Status),
  /// Reconciliation backfill: insert at [`Status::NotStarted`] if absent,
  /// otherwise leave the existing node alone.
  Backfill,
}

impl StatusWrite {
  /// The status a freshly inserted node receives.
  pub fn initial_status(self) -> Status {
    match self {
      Self::Set(status) => status,
      Self::Backfill => Status::NotStarted,
    }
  }
}

/// The outcome of writing one status node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Upserted<K, C> {
  pub key:        K,
  pub content_id: C,
  /// The status stored after the write.
  pub status:     Status,
  /// `false` when the write was a no-op (backfill of an existing node, or
  /// setting a node to the status it already had).
  pub changed:    bool,
}

pub type CourseUpsert = Upserted<CourseStatusId, CourseId>;
pub type ClassUpsert = Upserted<ClassStatusId, ClassId>;
pub type LessonUpsert = Upserted<LessonStatusId, LessonId>;
pub type ExerciseUpsert = Upserted<ExerciseStatusId, ExerciseId>;

// ─── Addressing ──────────────────────────────────────────────────────────────

/// The node an explicit mutation targets, addressed by the minimal key chain
/// for its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTarget {
  Course { course: CourseId },
  Class { course: CourseId, class: ClassId },
  Lesson { class: ClassId, lesson: LessonId },
  Exercise { lesson: LessonId, exercise: ExerciseId },
}

impl StatusTarget {
  pub fn level(&self) -> &'static str {
    match self {
      Self::Course { .. } => "course",
      Self::Class { .. } => "class",
      Self::Lesson { .. } => "lesson",
      Self::Exercise { .. } => "exercise",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backfill_starts_not_started() {
    assert_eq!(StatusWrite::Backfill.initial_status(), Status::NotStarted);
    assert_eq!(
      StatusWrite::Set(Status::Completed).initial_status(),
      Status::Completed
    );
  }

  #[test]
  fn node_count_covers_every_level() {
    let now = Utc::now();
    let exercise = |id| ExerciseStatus {
      key:         ExerciseStatusId::new(id).unwrap(),
      exercise_id: ExerciseId::new(id).unwrap(),
      status:      Status::NotStarted,
      updated_at:  now,
    };
    let course = CourseStatus {
      key:        CourseStatusId::new(1).unwrap(),
      course_id:  CourseId::new(1).unwrap(),
      status:     Status::InProgress,
      updated_at: now,
      classes:    vec![ClassStatus {
        key:        ClassStatusId::new(1).unwrap(),
        class_id:   ClassId::new(10).unwrap(),
        status:     Status::NotStarted,
        updated_at: now,
        lessons:    vec![LessonStatus {
          key:        LessonStatusId::new(1).unwrap(),
          lesson_id:  LessonId::new(100).unwrap(),
          status:     Status::NotStarted,
          updated_at: now,
          exercises:  vec![exercise(1001), exercise(1002)],
        }],
      }],
    };

    assert_eq!(course.node_count(), 5);
    let lesson = course
      .class(ClassId::new(10).unwrap())
      .and_then(|c| c.lesson(LessonId::new(100).unwrap()))
      .unwrap();
    assert!(lesson.exercise(ExerciseId::new(1002).unwrap()).is_some());
    assert!(lesson.exercise(ExerciseId::new(1003).unwrap()).is_none());
  }
}
