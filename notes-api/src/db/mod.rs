mod migrations;

use rusqlite::functions::FunctionFlags;
use uuid::Uuid;

use crate::config::config;

use migrations::MIGRATIONS;

pub use rusqlite;
pub use tokio_rusqlite;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not_found")]
    NotFound(String),
    #[error(transparent)]
    TokioRusqlite(tokio_rusqlite::Error),
    #[error(transparent)]
    Rusqlite(rusqlite::Error),
    #[error(transparent)]
    Migration(#[from] rusqlite_migration::Error),
}

impl Error {
    pub fn not_found_message(self, message: impl Into<String>) -> Self {
        if matches!(self, Self::NotFound(_)) {
            return Self::NotFound(message.into());
        }
        self
    }
}

impl From<tokio_rusqlite::Error> for Error {
    fn from(error: tokio_rusqlite::Error) -> Self {
        match error {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::QueryReturnedNoRows) => Self::NotFound("Not found".into()),
            error => Self::TokioRusqlite(error),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound("Not found".into()),
            error => Self::Rusqlite(error),
        }
    }
}

pub type DB = tokio_rusqlite::Connection;

pub async fn init_db() -> Result<DB> {
    let conn = tokio_rusqlite::Connection::open(&config().database_url).await?;

    conn.call(|conn| {
        add_uuid_functions(conn)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(())
    })
    .await?;

    migrate(&conn).await?;

    tracing::info!("database ready at {}", config().database_url);

    Ok(conn)
}

#[cfg(test)]
pub async fn init_test_db() -> Result<DB> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;

    conn.call(|conn| {
        add_uuid_functions(conn)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    })
    .await?;

    migrate(&conn).await?;

    Ok(conn)
}

async fn migrate(conn: &DB) -> Result<()> {
    conn.call(|conn| {
        MIGRATIONS
            .to_latest(conn)
            .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))
    })
    .await
    .map_err(|error| match error {
        tokio_rusqlite::Error::Other(err) => match err.downcast::<rusqlite_migration::Error>() {
            Ok(err) => Error::Migration(*err),
            Err(err) => Error::TokioRusqlite(tokio_rusqlite::Error::Other(err)),
        },
        error => Error::from(error),
    })
}

fn add_uuid_functions(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function("uuid7_now", 0, FunctionFlags::SQLITE_UTF8, |_| Ok(Uuid::now_v7()))?;

    conn.create_scalar_function("uuid_blob", 1, FunctionFlags::SQLITE_UTF8, |ctx| {
        let value = ctx.get::<String>(0)?;
        let uuid = Uuid::parse_str(&value).map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;

        Ok(uuid)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_valid() {
        MIGRATIONS.validate().unwrap();
    }

    #[tokio::test]
    async fn fts_tables_follow_notes() -> Result<()> {
        let db = init_test_db().await?;

        let counts = db
            .call(|conn| {
                let matches = |conn: &rusqlite::Connection, table: &str, term: &str| {
                    conn.query_row(
                        &format!("SELECT count(*) FROM {table} WHERE {table} MATCH ?"),
                        [term],
                        |r| r.get::<_, u32>(0),
                    )
                };

                conn.execute_batch(
                    r#"
                    INSERT INTO notes (id, owner, title, content, tags, created_at)
                        VALUES (uuid_blob('018f6138-5b4f-722d-97c5-29b927cedbd4'), uuid_blob('018f6146-32f4-7948-8289-cfb5cdb2b2af'), 'first', 'one', '[]', '2024-01-01 00:00:00+00:00');
                    UPDATE notes SET title = 'renamed' WHERE id = uuid_blob('018f6138-5b4f-722d-97c5-29b927cedbd4');
                    INSERT INTO notes_title_fts (notes_title_fts) VALUES ('integrity-check');
                    INSERT INTO notes_content_fts (notes_content_fts) VALUES ('integrity-check');
                    "#,
                )?;

                let renamed = matches(conn, "notes_title_fts", "renamed")?;
                let stale = matches(conn, "notes_title_fts", "first")?;

                conn.execute("DELETE FROM notes", [])?;
                conn.execute_batch(
                    r#"
                    INSERT INTO notes_title_fts (notes_title_fts) VALUES ('integrity-check');
                    INSERT INTO notes_content_fts (notes_content_fts) VALUES ('integrity-check');
                    "#,
                )?;

                let left = matches(conn, "notes_title_fts", "renamed")? + matches(conn, "notes_content_fts", "one")?;

                Ok((renamed, stale, left))
            })
            .await?;

        assert_eq!(counts, (1, 0, 0));
        Ok(())
    }
}
