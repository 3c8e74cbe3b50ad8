//! [`SqliteStore`]: the SQLite implementation of [`ProgressStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use sportplus_core::{
  id::{
    ClassId, ClassStatusId, ClientId, CourseId, CourseStatusId, ExerciseId,
    ExerciseStatusId, LessonId, LessonStatusId,
  },
  progress::{
    ClassStatus, ClassUpsert, ClientProgress, CourseStatus, CourseUpsert,
    ExerciseStatus, ExerciseUpsert, LessonStatus, LessonUpsert, StatusWrite, Upserted,
  },
  store::ProgressStore,
};

use crate::{
  Result,
  encode::{
    RawStatusRow, RawTree, decode_dt, decode_exercise_status, decode_status, encode_dt,
    encode_status,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Sport Plus store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every
/// statement runs on the connection's own thread, one closure at a time.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn write_status(
    &self,
    level: &'static Level,
    parent: i64,
    content_id: i64,
    write: StatusWrite,
  ) -> Result<(i64, String, bool)> {
    let now = encode_dt(Utc::now());
    Ok(
      self
        .conn
        .call(move |conn| Ok(upsert_row(conn, level, parent, content_id, write, &now)?))
        .await?,
    )
  }
}

// ─── Table descriptors ───────────────────────────────────────────────────────

/// Column names of one status table. All four tables share the same shape:
/// `(key, parent, content, status, updated_at)` with `UNIQUE (parent, content)`.
struct Level {
  table:   &'static str,
  key:     &'static str,
  parent:  &'static str,
  content: &'static str,
}

const COURSES: Level = Level {
  table:   "course_statuses",
  key:     "course_status_id",
  parent:  "client_id",
  content: "course_id",
};

const CLASSES: Level = Level {
  table:   "class_statuses",
  key:     "class_status_id",
  parent:  "course_status_id",
  content: "class_id",
};

const LESSONS: Level = Level {
  table:   "lesson_statuses",
  key:     "lesson_status_id",
  parent:  "class_status_id",
  content: "lesson_id",
};

const EXERCISES: Level = Level {
  table:   "exercise_statuses",
  key:     "exercise_status_id",
  parent:  "lesson_status_id",
  content: "exercise_id",
};

/// Insert or update one status row and read back its key and status.
///
/// The uniqueness constraint arbitrates concurrent writers: an explicit set
/// overwrites the status of an existing row (only if it differs), a backfill
/// leaves an existing row alone. The returned flag is `true` iff a row was
/// inserted or modified.
fn upsert_row(
  conn: &rusqlite::Connection,
  level: &Level,
  parent: i64,
  content_id: i64,
  write: StatusWrite,
  now: &str,
) -> rusqlite::Result<(i64, String, bool)> {
  let Level { table, key, parent: parent_col, content } = level;

  let on_conflict = match write {
    StatusWrite::Set(_) => format!(
      "DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at
       WHERE {table}.status != excluded.status"
    ),
    StatusWrite::Backfill => "DO NOTHING".to_owned(),
  };

  let changed = conn.execute(
    &format!(
      "INSERT INTO {table} ({parent_col}, {content}, status, updated_at)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT ({parent_col}, {content}) {on_conflict}"
    ),
    rusqlite::params![parent, content_id, encode_status(write.initial_status()), now],
  )? > 0;

  let (row_key, status) = conn.query_row(
    &format!("SELECT {key}, status FROM {table} WHERE {parent_col} = ?1 AND {content} = ?2"),
    rusqlite::params![parent, content_id],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )?;

  Ok((row_key, status, changed))
}

fn find_key(
  conn: &rusqlite::Connection,
  level: &Level,
  parent: i64,
  content_id: i64,
) -> rusqlite::Result<Option<i64>> {
  let Level { table, key, parent: parent_col, content } = level;
  conn
    .query_row(
      &format!("SELECT {key} FROM {table} WHERE {parent_col} = ?1 AND {content} = ?2"),
      rusqlite::params![parent, content_id],
      |row| row.get(0),
    )
    .optional()
}

fn into_upserted<K, C>(
  raw: (i64, String, bool),
  content_id: C,
  key: impl FnOnce(i64) -> sportplus_core::Result<K>,
) -> Result<Upserted<K, C>> {
  let (row_key, status, changed) = raw;
  Ok(Upserted {
    key: key(row_key)?,
    content_id,
    status: decode_status(&status)?,
    changed,
  })
}

// ─── Subtree loading ─────────────────────────────────────────────────────────

/// The root of a subtree to load. Every level at or below the root is read
/// with one query, joined up to `course_statuses` so a single filter applies.
#[derive(Debug, Clone, Copy)]
enum Scope {
  Client(i64),
  Course(i64),
  Class(i64),
  Lesson(i64),
}

impl Scope {
  fn filter(self) -> (&'static str, i64) {
    match self {
      Scope::Client(id) => ("cs.client_id = ?1", id),
      Scope::Course(key) => ("cs.course_status_id = ?1", key),
      Scope::Class(key) => ("cl.class_status_id = ?1", key),
      Scope::Lesson(key) => ("ls.lesson_status_id = ?1", key),
    }
  }

  fn depth(self) -> u8 {
    match self {
      Scope::Client(_) | Scope::Course(_) => 0,
      Scope::Class(_) => 1,
      Scope::Lesson(_) => 2,
    }
  }
}

fn query_rows(
  conn: &rusqlite::Connection,
  sql: &str,
  param: i64,
) -> rusqlite::Result<Vec<RawStatusRow>> {
  let mut stmt = conn.prepare(sql)?;
  stmt
    .query_map(rusqlite::params![param], RawStatusRow::from_row)?
    .collect()
}

fn load_tree(conn: &rusqlite::Connection, scope: Scope) -> rusqlite::Result<RawTree> {
  let (filter, param) = scope.filter();
  let mut tree = RawTree::default();

  if scope.depth() == 0 {
    tree.courses = query_rows(
      conn,
      &format!(
        "SELECT cs.course_status_id, cs.client_id, cs.course_id, cs.status, cs.updated_at
         FROM course_statuses cs
         WHERE {filter}
         ORDER BY cs.course_status_id"
      ),
      param,
    )?;
  }

  if scope.depth() <= 1 {
    tree.classes = query_rows(
      conn,
      &format!(
        "SELECT cl.class_status_id, cl.course_status_id, cl.class_id, cl.status, cl.updated_at
         FROM class_statuses cl
         JOIN course_statuses cs ON cs.course_status_id = cl.course_status_id
         WHERE {filter}
         ORDER BY cl.class_status_id"
      ),
      param,
    )?;
  }

  tree.lessons = query_rows(
    conn,
    &format!(
      "SELECT ls.lesson_status_id, ls.class_status_id, ls.lesson_id, ls.status, ls.updated_at
       FROM lesson_statuses ls
       JOIN class_statuses  cl ON cl.class_status_id  = ls.class_status_id
       JOIN course_statuses cs ON cs.course_status_id = cl.course_status_id
       WHERE {filter}
       ORDER BY ls.lesson_status_id"
    ),
    param,
  )?;

  tree.exercises = query_rows(
    conn,
    &format!(
      "SELECT es.exercise_status_id, es.lesson_status_id, es.exercise_id, es.status, es.updated_at
       FROM exercise_statuses es
       JOIN lesson_statuses ls ON ls.lesson_status_id = es.lesson_status_id
       JOIN class_statuses  cl ON cl.class_status_id  = ls.class_status_id
       JOIN course_statuses cs ON cs.course_status_id = cl.course_status_id
       WHERE {filter}
       ORDER BY es.exercise_status_id"
    ),
    param,
  )?;

  Ok(tree)
}

/// Look up a node's key under `parent` and, if present, load its subtree.
fn load_child(
  conn: &rusqlite::Connection,
  level: &Level,
  parent: i64,
  content_id: i64,
  scope: fn(i64) -> Scope,
) -> rusqlite::Result<Option<RawTree>> {
  find_key(conn, level, parent, content_id)?
    .map(|key| load_tree(conn, scope(key)))
    .transpose()
}

fn ensure_client(conn: &rusqlite::Connection, client: i64, now: &str) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO client_progress (client_id, created_at) VALUES (?1, ?2)
     ON CONFLICT (client_id) DO NOTHING",
    rusqlite::params![client, now],
  )?;
  Ok(())
}

// ─── ProgressStore impl ──────────────────────────────────────────────────────

impl ProgressStore for SqliteStore {
  type Error = crate::Error;

  async fn get_or_create_client_progress(&self, client: ClientId) -> Result<ClientProgress> {
    let client_raw = client.get();
    let now = encode_dt(Utc::now());

    let (created_at, tree): (String, RawTree) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        ensure_client(&tx, client_raw, &now)?;
        let created_at: String = tx.query_row(
          "SELECT created_at FROM client_progress WHERE client_id = ?1",
          rusqlite::params![client_raw],
          |row| row.get(0),
        )?;
        let tree = load_tree(&tx, Scope::Client(client_raw))?;
        tx.commit()?;
        Ok((created_at, tree))
      })
      .await?;

    Ok(ClientProgress {
      client_id:  client,
      created_at: decode_dt(&created_at)?,
      courses:    tree.into_courses()?,
    })
  }

  // ── Course level ──────────────────────────────────────────────────────────

  async fn get_course_status(
    &self,
    client: ClientId,
    course: CourseId,
  ) -> Result<Option<CourseStatus>> {
    let (client_raw, course_raw) = (client.get(), course.get());

    let tree: Option<RawTree> = self
      .conn
      .call(move |conn| Ok(load_child(conn, &COURSES, client_raw, course_raw, Scope::Course)?))
      .await?;

    Ok(match tree {
      Some(tree) => tree.into_courses()?.into_iter().next(),
      None => None,
    })
  }

  async fn upsert_course_status(
    &self,
    client: ClientId,
    course: CourseId,
    write: StatusWrite,
  ) -> Result<CourseUpsert> {
    let (client_raw, course_raw) = (client.get(), course.get());
    let now = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        ensure_client(&tx, client_raw, &now)?;
        let raw = upsert_row(&tx, &COURSES, client_raw, course_raw, write, &now)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    into_upserted(raw, course, CourseStatusId::new)
  }

  // ── Class level ───────────────────────────────────────────────────────────

  async fn get_class_status(
    &self,
    parent: CourseStatusId,
    class: ClassId,
  ) -> Result<Option<ClassStatus>> {
    let (parent_raw, class_raw) = (parent.get(), class.get());

    let tree: Option<RawTree> = self
      .conn
      .call(move |conn| Ok(load_child(conn, &CLASSES, parent_raw, class_raw, Scope::Class)?))
      .await?;

    Ok(match tree {
      Some(tree) => tree.into_classes()?.into_iter().next(),
      None => None,
    })
  }

  async fn upsert_class_status(
    &self,
    parent: CourseStatusId,
    class: ClassId,
    write: StatusWrite,
  ) -> Result<ClassUpsert> {
    let raw = self.write_status(&CLASSES, parent.get(), class.get(), write).await?;
    into_upserted(raw, class, ClassStatusId::new)
  }

  // ── Lesson level ──────────────────────────────────────────────────────────

  async fn get_lesson_status(
    &self,
    parent: ClassStatusId,
    lesson: LessonId,
  ) -> Result<Option<LessonStatus>> {
    let (parent_raw, lesson_raw) = (parent.get(), lesson.get());

    let tree: Option<RawTree> = self
      .conn
      .call(move |conn| Ok(load_child(conn, &LESSONS, parent_raw, lesson_raw, Scope::Lesson)?))
      .await?;

    Ok(match tree {
      Some(tree) => tree.into_lessons()?.into_iter().next(),
      None => None,
    })
  }

  async fn upsert_lesson_status(
    &self,
    parent: ClassStatusId,
    lesson: LessonId,
    write: StatusWrite,
  ) -> Result<LessonUpsert> {
    let raw = self.write_status(&LESSONS, parent.get(), lesson.get(), write).await?;
    into_upserted(raw, lesson, LessonStatusId::new)
  }

  // ── Exercise level ────────────────────────────────────────────────────────

  async fn get_exercise_status(
    &self,
    parent: LessonStatusId,
    exercise: ExerciseId,
  ) -> Result<Option<ExerciseStatus>> {
    let (parent_raw, exercise_raw) = (parent.get(), exercise.get());

    let raw: Option<RawStatusRow> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT exercise_status_id, lesson_status_id, exercise_id, status, updated_at
               FROM exercise_statuses
               WHERE lesson_status_id = ?1 AND exercise_id = ?2",
              rusqlite::params![parent_raw, exercise_raw],
              RawStatusRow::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(decode_exercise_status).transpose()
  }

  async fn upsert_exercise_status(
    &self,
    parent: LessonStatusId,
    exercise: ExerciseId,
    write: StatusWrite,
  ) -> Result<ExerciseUpsert> {
    let raw = self.write_status(&EXERCISES, parent.get(), exercise.get(), write).await?;
    into_upserted(raw, exercise, ExerciseStatusId::new)
  }
}
