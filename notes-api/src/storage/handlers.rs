use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rusqlite::{params, Connection, OptionalExtension};

use crate::{config::config, ctx::BaseParams, db, Error, Result, DB};

use super::{Blob, StorageId, Upload, UploadResponse, UploadTarget};

const TOKEN_LEN: usize = 32;

pub async fn generate_upload_target(BaseParams { db, ctx }: BaseParams) -> Result<UploadTarget> {
    let user_id = ctx.require_user_id()?;

    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();
    let now = Utc::now();
    let expires_at = now + Duration::seconds(config().upload_ttl_secs);

    let upload_url = format!("{}/uploads/{token}", config().storage_url_prefix);

    db.call(move |conn| {
        conn.execute("DELETE FROM upload_targets WHERE expires_at <= ?", params![now])?;
        conn.execute(
            "INSERT INTO upload_targets (token, created_by, expires_at) VALUES (?, ?, ?)",
            params![token, user_id, expires_at],
        )?;

        Ok(UploadTarget {
            token,
            upload_url,
            expires_at,
        })
    })
    .await
    .map_err(Error::from)
}

pub async fn upload(token: String, Upload { content_type, data }: Upload, db: DB) -> Result<UploadResponse> {
    if data.is_empty() {
        return Err(Error::Validation("Upload body is empty".into()));
    }

    let size = data.len() as i64;

    let response = db
        .call(move |conn| {
            let tx = conn.transaction()?;

            let consumed = tx.execute(
                "DELETE FROM upload_targets WHERE token = ? AND expires_at > ?",
                params![token, Utc::now()],
            )?;
            if consumed == 0 {
                return Err(Error::NotFound("Upload target not found or expired".into()).into());
            }

            let storage_id: StorageId = tx.query_row(
                "INSERT INTO storage_blobs (content_type, size, data) VALUES (?, ?, ?) RETURNING id",
                params![content_type, size, data],
                |row| row.get(0),
            )?;

            tx.commit()?;

            Ok(UploadResponse { storage_id })
        })
        .await
        .map_err(Error::from)?;

    tracing::debug!("stored blob {} ({size} bytes)", response.storage_id);

    Ok(response)
}

pub async fn get_blob(storage_id: StorageId, db: DB) -> Result<Blob> {
    db.call(move |conn| {
        conn.query_row(
            "SELECT content_type, data FROM storage_blobs WHERE id = ?",
            params![storage_id],
            |row| {
                Ok(Blob {
                    content_type: row.get(0)?,
                    data: row.get(1)?,
                })
            },
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(|e| e.not_found_message("Blob not found"))
    .map_err(Error::from)
}

/// Public URL of a stored blob, or `None` when nothing is stored under the key.
pub fn resolve_url(conn: &Connection, storage_id: &StorageId) -> rusqlite::Result<Option<String>> {
    let found = conn
        .prepare_cached("SELECT 1 FROM storage_blobs WHERE id = ?")?
        .query_row(params![storage_id], |_| Ok(()))
        .optional()?;

    Ok(found.map(|_| format!("{}/{storage_id}", config().storage_url_prefix)))
}
