//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and statuses as their literal
//! labels. Rows are read into `Raw*` structs inside the connection closure and
//! decoded afterwards, so no domain error ever has to cross the
//! `tokio_rusqlite` boundary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sportplus_core::{
  Status,
  content::{Class, Course, Exercise, Lesson},
  id::{
    ClassId, ClassStatusId, CourseId, CourseStatusId, ExerciseId, ExerciseStatusId,
    LessonId, LessonStatusId,
  },
  progress::{ClassStatus, CourseStatus, ExerciseStatus, LessonStatus},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(s: Status) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<Status> { Ok(s.parse()?) }

// ─── Status rows ─────────────────────────────────────────────────────────────

/// The five columns every status table shares, in `SELECT` order. `parent`
/// is the client id for course rows and the parent row key otherwise.
pub struct RawStatusRow {
  pub key:        i64,
  pub parent:     i64,
  pub content_id: i64,
  pub status:     String,
  pub updated_at: String,
}

impl RawStatusRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      key:        row.get(0)?,
      parent:     row.get(1)?,
      content_id: row.get(2)?,
      status:     row.get(3)?,
      updated_at: row.get(4)?,
    })
  }
}

/// Flat rows of a progress subtree, one vector per level, each ordered by
/// row key.
#[derive(Default)]
pub struct RawTree {
  pub courses:   Vec<RawStatusRow>,
  pub classes:   Vec<RawStatusRow>,
  pub lessons:   Vec<RawStatusRow>,
  pub exercises: Vec<RawStatusRow>,
}

impl RawTree {
  pub fn into_courses(self) -> Result<Vec<CourseStatus>> {
    let RawTree { courses, classes, lessons, exercises } = self;
    let mut classes = build_classes(classes, lessons, exercises)?;

    courses
      .into_iter()
      .map(|r| -> Result<CourseStatus> {
        Ok(CourseStatus {
          key:        CourseStatusId::new(r.key)?,
          course_id:  CourseId::new(r.content_id)?,
          status:     decode_status(&r.status)?,
          updated_at: decode_dt(&r.updated_at)?,
          classes:    classes.remove(&r.key).unwrap_or_default(),
        })
      })
      .collect()
  }

  /// Assemble a tree loaded from class level down.
  pub fn into_classes(self) -> Result<Vec<ClassStatus>> {
    let RawTree { classes, lessons, exercises, .. } = self;
    Ok(flatten(build_classes(classes, lessons, exercises)?))
  }

  /// Assemble a tree loaded from lesson level down.
  pub fn into_lessons(self) -> Result<Vec<LessonStatus>> {
    let RawTree { lessons, exercises, .. } = self;
    let mut exercises = build_exercises(exercises)?;
    Ok(flatten(build_lessons(lessons, &mut exercises)?))
  }
}

pub fn decode_exercise_status(r: RawStatusRow) -> Result<ExerciseStatus> {
  Ok(ExerciseStatus {
    key:         ExerciseStatusId::new(r.key)?,
    exercise_id: ExerciseId::new(r.content_id)?,
    status:      decode_status(&r.status)?,
    updated_at:  decode_dt(&r.updated_at)?,
  })
}

/// Group decoded rows under their parent key, keeping row order.
fn group<T>(
  rows: Vec<RawStatusRow>,
  mut decode: impl FnMut(RawStatusRow) -> Result<T>,
) -> Result<HashMap<i64, Vec<T>>> {
  let mut out: HashMap<i64, Vec<T>> = HashMap::new();
  for row in rows {
    let parent = row.parent;
    out.entry(parent).or_default().push(decode(row)?);
  }
  Ok(out)
}

fn flatten<T>(groups: HashMap<i64, Vec<T>>) -> Vec<T> {
  let mut groups: Vec<_> = groups.into_iter().collect();
  groups.sort_by_key(|(parent, _)| *parent);
  groups.into_iter().flat_map(|(_, nodes)| nodes).collect()
}

fn build_exercises(rows: Vec<RawStatusRow>) -> Result<HashMap<i64, Vec<ExerciseStatus>>> {
  group(rows, decode_exercise_status)
}

fn build_lessons(
  rows: Vec<RawStatusRow>,
  exercises: &mut HashMap<i64, Vec<ExerciseStatus>>,
) -> Result<HashMap<i64, Vec<LessonStatus>>> {
  group(rows, |r| {
    Ok(LessonStatus {
      key:        LessonStatusId::new(r.key)?,
      lesson_id:  LessonId::new(r.content_id)?,
      status:     decode_status(&r.status)?,
      updated_at: decode_dt(&r.updated_at)?,
      exercises:  exercises.remove(&r.key).unwrap_or_default(),
    })
  })
}

fn build_classes(
  rows: Vec<RawStatusRow>,
  lessons: Vec<RawStatusRow>,
  exercises: Vec<RawStatusRow>,
) -> Result<HashMap<i64, Vec<ClassStatus>>> {
  let mut exercises = build_exercises(exercises)?;
  let mut lessons = build_lessons(lessons, &mut exercises)?;
  group(rows, |r| {
    Ok(ClassStatus {
      key:        ClassStatusId::new(r.key)?,
      class_id:   ClassId::new(r.content_id)?,
      status:     decode_status(&r.status)?,
      updated_at: decode_dt(&r.updated_at)?,
      lessons:    lessons.remove(&r.key).unwrap_or_default(),
    })
  })
}

// ─── Content rows ────────────────────────────────────────────────────────────

pub struct RawCourse {
  pub course_id:   i64,
  pub title:       String,
  pub description: Option<String>,
}

pub struct RawClass {
  pub class_id:  i64,
  pub course_id: i64,
  pub title:     String,
}

pub struct RawLesson {
  pub lesson_id: i64,
  pub class_id:  i64,
  pub title:     String,
}

/// A `lesson_exercises` row joined with the exercise it points at.
pub struct RawLessonExercise {
  pub lesson_id:   i64,
  pub exercise_id: i64,
  pub name:        String,
}

/// Every content row needed to build a set of nested courses, each vector in
/// display order.
#[derive(Default)]
pub struct RawContent {
  pub courses:   Vec<RawCourse>,
  pub classes:   Vec<RawClass>,
  pub lessons:   Vec<RawLesson>,
  pub exercises: Vec<RawLessonExercise>,
}

impl RawContent {
  pub fn into_courses(self) -> Result<Vec<Course>> {
    let mut exercises: HashMap<i64, Vec<Exercise>> = HashMap::new();
    for r in self.exercises {
      exercises.entry(r.lesson_id).or_default().push(Exercise {
        id:   ExerciseId::new(r.exercise_id)?,
        name: r.name,
      });
    }

    let mut lessons: HashMap<i64, Vec<Lesson>> = HashMap::new();
    for r in self.lessons {
      lessons.entry(r.class_id).or_default().push(Lesson {
        id:        LessonId::new(r.lesson_id)?,
        class_id:  ClassId::new(r.class_id)?,
        title:     r.title,
        exercises: exercises.remove(&r.lesson_id).unwrap_or_default(),
      });
    }

    let mut classes: HashMap<i64, Vec<Class>> = HashMap::new();
    for r in self.classes {
      classes.entry(r.course_id).or_default().push(Class {
        id:        ClassId::new(r.class_id)?,
        course_id: CourseId::new(r.course_id)?,
        title:     r.title,
        lessons:   lessons.remove(&r.class_id).unwrap_or_default(),
      });
    }

    self
      .courses
      .into_iter()
      .map(|r| -> Result<Course> {
        Ok(Course {
          id:          CourseId::new(r.course_id)?,
          title:       r.title,
          description: r.description,
          classes:     classes.remove(&r.course_id).unwrap_or_default(),
        })
      })
      .collect()
  }
}
