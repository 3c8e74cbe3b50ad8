//! Handlers for `/clients/{client}/progress` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/clients/:client/progress` | Whole tree, reconciled |
//! | `GET`  | `/clients/:client/progress/courses/:course` | 404 if the course is unknown |
//! | `PUT`  | `/clients/:client/progress/courses/:course` | Body: `{"status":"Завершено"}` |
//! | `PUT`  | `/clients/:client/progress/courses/:course/classes/:class` | |
//! | `PUT`  | `/clients/:client/progress/classes/:class/lessons/:lesson` | |
//! | `PUT`  | `/clients/:client/progress/lessons/:lesson/exercises/:exercise` | |
//!
//! Reads answer `{"progress": …, "report": …}`; writes answer the client's
//! stored tree without reconciling it.

use std::{str::FromStr, sync::Arc};

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use sportplus_core::{
  Status,
  id::{ClassId, ClientId, CourseId, ExerciseId, LessonId},
  progress::{ClientProgress, CourseStatus},
  store::{ContentStore, ProgressStore},
};
use sportplus_engine::{ProgressEngine, Reconciled};

use crate::error::ApiError;

type Engine<P, C> = State<Arc<ProgressEngine<P, C>>>;

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: Status,
}

fn parse<T>(raw: &str) -> Result<T, ApiError>
where
  T: FromStr<Err = sportplus_core::Error>,
{
  Ok(raw.parse()?)
}

fn status(body: Result<Json<StatusBody>, JsonRejection>) -> Result<Status, ApiError> {
  let Json(body) = body?;
  Ok(body.status)
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /clients/:client/progress`
pub async fn full<P, C>(
  State(engine): Engine<P, C>,
  Path(client): Path<String>,
) -> Result<Json<Reconciled<ClientProgress>>, ApiError>
where
  P: ProgressStore,
  C: ContentStore,
{
  let client: ClientId = parse(&client)?;
  Ok(Json(engine.full_progress(client).await?))
}

/// `GET /clients/:client/progress/courses/:course`
pub async fn course<P, C>(
  State(engine): Engine<P, C>,
  Path((client, course)): Path<(String, String)>,
) -> Result<Json<Reconciled<CourseStatus>>, ApiError>
where
  P: ProgressStore,
  C: ContentStore,
{
  let client: ClientId = parse(&client)?;
  let course: CourseId = parse(&course)?;
  Ok(Json(engine.course_progress(client, course).await?))
}

// ─── Writes ───────────────────────────────────────────────────────────────────

/// `PUT /clients/:client/progress/courses/:course`
pub async fn set_course<P, C>(
  State(engine): Engine<P, C>,
  Path((client, course)): Path<(String, String)>,
  body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<ClientProgress>, ApiError>
where
  P: ProgressStore,
  C: ContentStore,
{
  let client: ClientId = parse(&client)?;
  let course: CourseId = parse(&course)?;
  let status = status(body)?;
  Ok(Json(engine.set_course_status(client, course, status).await?))
}

/// `PUT /clients/:client/progress/courses/:course/classes/:class`
pub async fn set_class<P, C>(
  State(engine): Engine<P, C>,
  Path((client, course, class)): Path<(String, String, String)>,
  body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<ClientProgress>, ApiError>
where
  P: ProgressStore,
  C: ContentStore,
{
  let client: ClientId = parse(&client)?;
  let course: CourseId = parse(&course)?;
  let class: ClassId = parse(&class)?;
  let status = status(body)?;
  Ok(Json(
    engine.set_class_status(client, course, class, status).await?,
  ))
}

/// `PUT /clients/:client/progress/classes/:class/lessons/:lesson`
pub async fn set_lesson<P, C>(
  State(engine): Engine<P, C>,
  Path((client, class, lesson)): Path<(String, String, String)>,
  body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<ClientProgress>, ApiError>
where
  P: ProgressStore,
  C: ContentStore,
{
  let client: ClientId = parse(&client)?;
  let class: ClassId = parse(&class)?;
  let lesson: LessonId = parse(&lesson)?;
  let status = status(body)?;
  Ok(Json(
    engine.set_lesson_status(client, class, lesson, status).await?,
  ))
}

/// `PUT /clients/:client/progress/lessons/:lesson/exercises/:exercise`
pub async fn set_exercise<P, C>(
  State(engine): Engine<P, C>,
  Path((client, lesson, exercise)): Path<(String, String, String)>,
  body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<ClientProgress>, ApiError>
where
  P: ProgressStore,
  C: ContentStore,
{
  let client: ClientId = parse(&client)?;
  let lesson: LessonId = parse(&lesson)?;
  let exercise: ExerciseId = parse(&exercise)?;
  let status = status(body)?;
  Ok(Json(
    engine
      .set_exercise_status(client, lesson, exercise, status)
      .await?,
  ))
}
