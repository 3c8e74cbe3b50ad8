//! Content tables: the [`ContentStore`] read side, plus the authoring and
//! bulk-import calls used by the server's `import` command and by tests.

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use sportplus_core::{
  content::{
    Class, ClassPath, ContentImport, Course, CoursePatch, Exercise, ExercisePath, Lesson,
    LessonPath,
  },
  id::{ClassId, CourseId, ExerciseId, LessonId},
  store::ContentStore,
};

use crate::{
  Error, Result, SqliteStore,
  encode::{RawClass, RawContent, RawCourse, RawLesson, RawLessonExercise, encode_dt},
};

/// Rows written by [`SqliteStore::import_content`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
  pub exercises:   usize,
  pub courses:     usize,
  pub classes:     usize,
  pub lessons:     usize,
  pub attachments: usize,
}

/// Read every content row of one course (or of all courses when `course` is
/// `None`) in display order.
fn load_content(conn: &rusqlite::Connection, course: Option<i64>) -> rusqlite::Result<RawContent> {
  let mut content = RawContent::default();

  let mut stmt = conn.prepare(
    "SELECT course_id, title, description
     FROM courses
     WHERE ?1 IS NULL OR course_id = ?1
     ORDER BY course_id",
  )?;
  content.courses = stmt
    .query_map(rusqlite::params![course], |row| {
      Ok(RawCourse {
        course_id:   row.get(0)?,
        title:       row.get(1)?,
        description: row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<_>>()?;

  let mut stmt = conn.prepare(
    "SELECT class_id, course_id, title
     FROM classes
     WHERE ?1 IS NULL OR course_id = ?1
     ORDER BY position, class_id",
  )?;
  content.classes = stmt
    .query_map(rusqlite::params![course], |row| {
      Ok(RawClass {
        class_id:  row.get(0)?,
        course_id: row.get(1)?,
        title:     row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<_>>()?;

  let mut stmt = conn.prepare(
    "SELECT l.lesson_id, l.class_id, l.title
     FROM lessons l
     JOIN classes c ON c.class_id = l.class_id
     WHERE ?1 IS NULL OR c.course_id = ?1
     ORDER BY l.position, l.lesson_id",
  )?;
  content.lessons = stmt
    .query_map(rusqlite::params![course], |row| {
      Ok(RawLesson {
        lesson_id: row.get(0)?,
        class_id:  row.get(1)?,
        title:     row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<_>>()?;

  let mut stmt = conn.prepare(
    "SELECT le.lesson_id, e.exercise_id, e.name
     FROM lesson_exercises le
     JOIN exercises e ON e.exercise_id = le.exercise_id
     JOIN lessons   l ON l.lesson_id   = le.lesson_id
     JOIN classes   c ON c.class_id    = l.class_id
     WHERE ?1 IS NULL OR c.course_id = ?1
     ORDER BY le.position, e.exercise_id",
  )?;
  content.exercises = stmt
    .query_map(rusqlite::params![course], |row| {
      Ok(RawLessonExercise {
        lesson_id:   row.get(0)?,
        exercise_id: row.get(1)?,
        name:        row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<_>>()?;

  Ok(content)
}

fn exists(conn: &rusqlite::Connection, sql: &str, id: i64) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![id], |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

// ─── ContentStore impl ───────────────────────────────────────────────────────

impl ContentStore for SqliteStore {
  type Error = Error;

  async fn get_course(&self, id: CourseId) -> Result<Option<Course>> {
    let id_raw = id.get();
    let raw = self
      .conn
      .call(move |conn| Ok(load_content(conn, Some(id_raw))?))
      .await?;
    Ok(raw.into_courses()?.into_iter().next())
  }

  async fn course_exists(&self, id: CourseId) -> Result<bool> {
    let id_raw = id.get();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(exists(conn, "SELECT 1 FROM courses WHERE course_id = ?1", id_raw)?)
        })
        .await?,
    )
  }

  async fn list_courses(&self) -> Result<Vec<Course>> {
    let raw = self
      .conn
      .call(|conn| Ok(load_content(conn, None)?))
      .await?;
    raw.into_courses()
  }

  async fn locate_class(&self, id: ClassId) -> Result<Option<ClassPath>> {
    let id_raw = id.get();
    let course: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT course_id FROM classes WHERE class_id = ?1",
              rusqlite::params![id_raw],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    course
      .map(|course| -> Result<ClassPath> {
        Ok(ClassPath { course: CourseId::new(course)?, class: id })
      })
      .transpose()
  }

  async fn locate_lesson(&self, id: LessonId) -> Result<Option<LessonPath>> {
    let id_raw = id.get();
    let row: Option<(i64, i64)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT c.course_id, l.class_id
               FROM lessons l
               JOIN classes c ON c.class_id = l.class_id
               WHERE l.lesson_id = ?1",
              rusqlite::params![id_raw],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(course, class)| -> Result<LessonPath> {
        Ok(LessonPath {
          course: CourseId::new(course)?,
          class:  ClassId::new(class)?,
          lesson: id,
        })
      })
      .transpose()
  }

  async fn locate_exercise(
    &self,
    lesson: LessonId,
    exercise: ExerciseId,
  ) -> Result<Option<ExercisePath>> {
    let (lesson_raw, exercise_raw) = (lesson.get(), exercise.get());
    let row: Option<(i64, i64)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT c.course_id, l.class_id
               FROM lesson_exercises le
               JOIN lessons l ON l.lesson_id = le.lesson_id
               JOIN classes c ON c.class_id  = l.class_id
               WHERE le.lesson_id = ?1 AND le.exercise_id = ?2",
              rusqlite::params![lesson_raw, exercise_raw],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(course, class)| -> Result<ExercisePath> {
        Ok(ExercisePath {
          course: CourseId::new(course)?,
          class: ClassId::new(class)?,
          lesson,
          exercise,
        })
      })
      .transpose()
  }
}

// ─── Authoring ───────────────────────────────────────────────────────────────

impl SqliteStore {
  pub async fn add_course(
    &self,
    title: impl Into<String>,
    description: Option<String>,
  ) -> Result<Course> {
    let title = title.into();
    let (title_c, description_c) = (title.clone(), description.clone());
    let now = encode_dt(Utc::now());

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO courses (title, description, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?3)",
          rusqlite::params![title_c, description_c, now],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Course { id: CourseId::new(id)?, title, description, classes: vec![] })
  }

  /// Append a class to the end of `course`.
  pub async fn add_class(&self, course: CourseId, title: impl Into<String>) -> Result<Class> {
    let title = title.into();
    let title_c = title.clone();
    let course_raw = course.get();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM courses WHERE course_id = ?1", course_raw)? {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO classes (course_id, title, position)
           VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM classes WHERE course_id = ?1))",
          rusqlite::params![course_raw, title_c],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let id = id.ok_or_else(|| Error::ContentNotFound(format!("course {course}")))?;
    Ok(Class { id: ClassId::new(id)?, course_id: course, title, lessons: vec![] })
  }

  /// Append a lesson to the end of `class`.
  pub async fn add_lesson(&self, class: ClassId, title: impl Into<String>) -> Result<Lesson> {
    let title = title.into();
    let title_c = title.clone();
    let class_raw = class.get();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM classes WHERE class_id = ?1", class_raw)? {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO lessons (class_id, title, position)
           VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM lessons WHERE class_id = ?1))",
          rusqlite::params![class_raw, title_c],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let id = id.ok_or_else(|| Error::ContentNotFound(format!("class {class}")))?;
    Ok(Lesson { id: LessonId::new(id)?, class_id: class, title, exercises: vec![] })
  }

  /// Add an exercise to the shared catalogue.
  pub async fn add_exercise(&self, name: impl Into<String>) -> Result<Exercise> {
    let name = name.into();
    let name_c = name.clone();

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute("INSERT INTO exercises (name) VALUES (?1)", rusqlite::params![name_c])?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Exercise { id: ExerciseId::new(id)?, name })
  }

  /// Append `exercise` to `lesson`. Attaching an already-attached exercise is
  /// a no-op.
  pub async fn attach_exercise(&self, lesson: LessonId, exercise: ExerciseId) -> Result<()> {
    let (lesson_raw, exercise_raw) = (lesson.get(), exercise.get());

    let missing: Option<String> = self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM lessons WHERE lesson_id = ?1", lesson_raw)? {
          return Ok(Some(format!("lesson {lesson_raw}")));
        }
        if !exists(conn, "SELECT 1 FROM exercises WHERE exercise_id = ?1", exercise_raw)? {
          return Ok(Some(format!("exercise {exercise_raw}")));
        }
        conn.execute(
          "INSERT INTO lesson_exercises (lesson_id, exercise_id, position)
           VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM lesson_exercises WHERE lesson_id = ?1))
           ON CONFLICT (lesson_id, exercise_id) DO NOTHING",
          rusqlite::params![lesson_raw, exercise_raw],
        )?;
        Ok(None)
      })
      .await?;

    match missing {
      Some(what) => Err(Error::ContentNotFound(what)),
      None => Ok(()),
    }
  }

  /// Apply a partial update to a course and return it fully nested.
  /// An empty patch writes nothing, not even `updated_at`.
  pub async fn update_course(&self, id: CourseId, patch: CoursePatch) -> Result<Course> {
    if patch.is_empty() {
      return self
        .get_course(id)
        .await?
        .ok_or_else(|| Error::ContentNotFound(format!("course {id}")));
    }

    let id_raw = id.get();
    let now = encode_dt(Utc::now());
    let CoursePatch { title, description } = patch;
    let set_title = title.is_some();
    let set_description = description.is_some();
    let description = description.flatten();

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE courses SET
             title       = CASE WHEN ?2 THEN ?3 ELSE title END,
             description = CASE WHEN ?4 THEN ?5 ELSE description END,
             updated_at  = ?6
           WHERE course_id = ?1",
          rusqlite::params![id_raw, set_title, title, set_description, description, now],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::ContentNotFound(format!("course {id}")));
    }
    self
      .get_course(id)
      .await?
      .ok_or_else(|| Error::ContentNotFound(format!("course {id}")))
  }

  /// Load a content document in one transaction.
  ///
  /// Rows are upserted by id, so re-importing a document that grew (a new
  /// lesson, another exercise on an existing lesson) extends the content in
  /// place. Nothing is deleted.
  pub async fn import_content(&self, import: ContentImport) -> Result<ImportSummary> {
    let now = encode_dt(Utc::now());

    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut summary = ImportSummary::default();

        for exercise in &import.exercises {
          tx.execute(
            "INSERT INTO exercises (exercise_id, name) VALUES (?1, ?2)
             ON CONFLICT (exercise_id) DO UPDATE SET name = excluded.name",
            rusqlite::params![exercise.id.get(), exercise.name],
          )?;
          summary.exercises += 1;
        }

        for course in &import.courses {
          tx.execute(
            "INSERT INTO courses (course_id, title, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (course_id) DO UPDATE SET
               title       = excluded.title,
               description = excluded.description,
               updated_at  = excluded.updated_at",
            rusqlite::params![course.id.get(), course.title, course.description, now],
          )?;
          summary.courses += 1;

          for (position, class) in course.classes.iter().enumerate() {
            tx.execute(
              "INSERT INTO classes (class_id, course_id, title, position) VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT (class_id) DO UPDATE SET
                 course_id = excluded.course_id,
                 title     = excluded.title,
                 position  = excluded.position",
              rusqlite::params![class.id.get(), course.id.get(), class.title, position as i64],
            )?;
            summary.classes += 1;

            for (position, lesson) in class.lessons.iter().enumerate() {
              tx.execute(
                "INSERT INTO lessons (lesson_id, class_id, title, position) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (lesson_id) DO UPDATE SET
                   class_id = excluded.class_id,
                   title    = excluded.title,
                   position = excluded.position",
                rusqlite::params![lesson.id.get(), class.id.get(), lesson.title, position as i64],
              )?;
              summary.lessons += 1;

              for (position, exercise) in lesson.exercises.iter().enumerate() {
                tx.execute(
                  "INSERT INTO lesson_exercises (lesson_id, exercise_id, position) VALUES (?1, ?2, ?3)
                   ON CONFLICT (lesson_id, exercise_id) DO UPDATE SET position = excluded.position",
                  rusqlite::params![lesson.id.get(), exercise.get(), position as i64],
                )?;
                summary.attachments += 1;
              }
            }
          }
        }

        tx.commit()?;
        Ok(summary)
      })
      .await?;

    Ok(summary)
  }
}
