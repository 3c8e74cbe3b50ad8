//! SQL schema for the Sport Plus SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Content ──────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS courses (
    course_id   INTEGER PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS classes (
    class_id  INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES courses(course_id),
    title     TEXT NOT NULL,
    position  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS lessons (
    lesson_id INTEGER PRIMARY KEY,
    class_id  INTEGER NOT NULL REFERENCES classes(class_id),
    title     TEXT NOT NULL,
    position  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS exercises (
    exercise_id INTEGER PRIMARY KEY,
    name        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lesson_exercises (
    lesson_id   INTEGER NOT NULL REFERENCES lessons(lesson_id),
    exercise_id INTEGER NOT NULL REFERENCES exercises(exercise_id),
    position    INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (lesson_id, exercise_id)
);

CREATE INDEX IF NOT EXISTS classes_course_idx ON classes(course_id);
CREATE INDEX IF NOT EXISTS lessons_class_idx  ON lessons(class_id);

-- ── Progress ─────────────────────────────────────────────────────────────────
--
-- Content ids are deliberately not foreign keys: status rows outlive the
-- content they shadow. Rows are never deleted.

CREATE TABLE IF NOT EXISTS client_progress (
    client_id  INTEGER PRIMARY KEY,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS course_statuses (
    course_status_id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id        INTEGER NOT NULL REFERENCES client_progress(client_id),
    course_id        INTEGER NOT NULL,
    status           TEXT NOT NULL CHECK (status IN ('Не начато', 'В процессе', 'Завершено')),
    updated_at       TEXT NOT NULL,
    UNIQUE (client_id, course_id)
);

CREATE TABLE IF NOT EXISTS class_statuses (
    class_status_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    course_status_id INTEGER NOT NULL REFERENCES course_statuses(course_status_id),
    class_id         INTEGER NOT NULL,
    status           TEXT NOT NULL CHECK (status IN ('Не начато', 'В процессе', 'Завершено')),
    updated_at       TEXT NOT NULL,
    UNIQUE (course_status_id, class_id)
);

CREATE TABLE IF NOT EXISTS lesson_statuses (
    lesson_status_id INTEGER PRIMARY KEY AUTOINCREMENT,
    class_status_id  INTEGER NOT NULL REFERENCES class_statuses(class_status_id),
    lesson_id        INTEGER NOT NULL,
    status           TEXT NOT NULL CHECK (status IN ('Не начато', 'В процессе', 'Завершено')),
    updated_at       TEXT NOT NULL,
    UNIQUE (class_status_id, lesson_id)
);

CREATE TABLE IF NOT EXISTS exercise_statuses (
    exercise_status_id INTEGER PRIMARY KEY AUTOINCREMENT,
    lesson_status_id   INTEGER NOT NULL REFERENCES lesson_statuses(lesson_status_id),
    exercise_id        INTEGER NOT NULL,
    status             TEXT NOT NULL CHECK (status IN ('Не начато', 'В процессе', 'Завершено')),
    updated_at         TEXT NOT NULL,
    UNIQUE (lesson_status_id, exercise_id)
);

PRAGMA user_version = 1;
";
