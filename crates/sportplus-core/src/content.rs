//! The content tree: courses, classes, lessons and the exercises they use.
//!
//! Content is authored outside the progress engine. The engine only ever
//! reads it, fully nested, through [`ContentStore`](crate::store::ContentStore).

use serde::{Deserialize, Serialize};

use crate::id::{ClassId, CourseId, ExerciseId, LessonId};

// ─── Nested content ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub id:          CourseId,
  pub title:       String,
  pub description: Option<String>,
  /// Classes in display order.
  pub classes:     Vec<Class>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
  pub id:        ClassId,
  pub course_id: CourseId,
  pub title:     String,
  /// Lessons in display order.
  pub lessons:   Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
  pub id:        LessonId,
  pub class_id:  ClassId,
  pub title:     String,
  /// Exercises in the order given by the lesson-exercise association.
  pub exercises: Vec<Exercise>,
}

/// An exercise from the shared catalogue. The same exercise may appear in
/// many lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
  pub id:   ExerciseId,
  pub name: String,
}

// ─── Ancestor chains ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassPath {
  pub course: CourseId,
  pub class:  ClassId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonPath {
  pub course: CourseId,
  pub class:  ClassId,
  pub lesson: LessonId,
}

/// Only exists when the exercise is actually attached to the lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExercisePath {
  pub course:   CourseId,
  pub class:    ClassId,
  pub lesson:   LessonId,
  pub exercise: ExerciseId,
}

// ─── Partial updates ─────────────────────────────────────────────────────────

/// A partial update of a course.
///
/// `None` leaves a field untouched. For nullable columns the inner option
/// distinguishes "set to this value" from "clear": `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoursePatch {
  pub title:       Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  pub description: Option<Option<String>>,
}

impl CoursePatch {
  pub fn is_empty(&self) -> bool { self.title.is_none() && self.description.is_none() }
}

/// Maps a present-but-null JSON field to `Some(None)`; a missing field stays
/// `None` through `#[serde(default)]`.
fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  Option::<String>::deserialize(de).map(Some)
}

// ─── Import document ─────────────────────────────────────────────────────────

/// A JSON document describing content to load in bulk.
///
/// Ids are explicit so progress recorded against them stays valid across
/// re-imports. Importing is additive: rows are inserted or renamed, never
/// removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentImport {
  #[serde(default)]
  pub exercises: Vec<Exercise>,
  #[serde(default)]
  pub courses:   Vec<ImportCourse>,
}

impl ContentImport {
  pub fn from_json(raw: &str) -> crate::Result<Self> { Ok(serde_json::from_str(raw)?) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCourse {
  pub id:          CourseId,
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub classes:     Vec<ImportClass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportClass {
  pub id:      ClassId,
  pub title:   String,
  #[serde(default)]
  pub lessons: Vec<ImportLesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLesson {
  pub id:        LessonId,
  pub title:     String,
  /// Exercise ids from the catalogue, in lesson order.
  #[serde(default)]
  pub exercises: Vec<ExerciseId>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn patch_distinguishes_missing_from_null() {
    let missing: CoursePatch = serde_json::from_str(r#"{"title":"Yoga"}"#).unwrap();
    assert_eq!(missing.title.as_deref(), Some("Yoga"));
    assert_eq!(missing.description, None);

    let cleared: CoursePatch = serde_json::from_str(r#"{"description":null}"#).unwrap();
    assert_eq!(cleared.description, Some(None));
    assert!(!cleared.is_empty());

    let set: CoursePatch = serde_json::from_str(r#"{"description":""}"#).unwrap();
    assert_eq!(set.description, Some(Some(String::new())));
  }

  #[test]
  fn import_document_parses_nested_courses() {
    let doc = ContentImport::from_json(
      r#"{
        "exercises": [{"id": 1001, "name": "Squat"}],
        "courses": [{
          "id": 1, "title": "Strength",
          "classes": [{"id": 10, "title": "Week 1",
            "lessons": [{"id": 100, "title": "Legs", "exercises": [1001]}]}]
        }]
      }"#,
    )
    .unwrap();

    assert_eq!(doc.exercises.len(), 1);
    let lesson = &doc.courses[0].classes[0].lessons[0];
    assert_eq!(lesson.id.get(), 100);
    assert_eq!(lesson.exercises[0].get(), 1001);
    assert!(doc.courses[0].description.is_none());
  }
}
