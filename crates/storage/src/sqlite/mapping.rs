use course_core::model::{Article, DiaryLink, NotificationPrefs, ParticipantId, ProgressRecord};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u8(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn i64_to_i8(field: &'static str, v: i64) -> Result<i8, StorageError> {
    i8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_participant_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressRecord, StorageError> {
    let completed_steps = i64_to_u8(
        "completed_steps",
        row.try_get::<i64, _>("completed_steps").map_err(ser)?,
    )?;

    let prefs = NotificationPrefs::new(
        i64_to_u8(
            "notification_hour",
            row.try_get::<i64, _>("notification_hour").map_err(ser)?,
        )?,
        i64_to_i8(
            "utc_offset_hours",
            row.try_get::<i64, _>("utc_offset_hours").map_err(ser)?,
        )?,
    )
    .map_err(ser)?;

    ProgressRecord::from_persisted(
        ParticipantId::new(row.try_get::<i64, _>("id").map_err(ser)?),
        completed_steps,
        row.try_get("start_date").map_err(ser)?,
        row.try_get("last_completed_at").map_err(ser)?,
        prefs,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_diary_row(row: &sqlx::sqlite::SqliteRow) -> Result<DiaryLink, StorageError> {
    let step = i64_to_u8("step", row.try_get::<i64, _>("step").map_err(ser)?)?;
    let url: String = row.try_get("url").map_err(ser)?;
    DiaryLink::new(step, &url).map_err(ser)
}

pub(crate) fn map_article_row(row: &sqlx::sqlite::SqliteRow) -> Result<Article, StorageError> {
    let step = i64_to_u8("step", row.try_get::<i64, _>("step").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let url: String = row.try_get("url").map_err(ser)?;
    Article::new(step, title, &url).map_err(ser)
}
