use chrono::Utc;
use rusqlite::{params, types::Type, Connection, Row};
use sea_query::{Expr, Iden, Order, Query, SqliteQueryBuilder};
use sea_query_rusqlite::RusqliteBinder;

use crate::{
    ctx::{BaseParams, UserId},
    db, storage, Error, Result,
};

use super::{
    search::{self, FullTextIndex},
    CreateNoteResponse, FindNotesResponse, Note, NoteFields, NoteId, SearchNotesQuery, TagsResponse,
};

#[derive(Iden)]
pub enum Notes {
    Table,
    Id,
    Owner,
    Title,
    Content,
    Tags,
    ImageRef,
    ImageUrl,
    CreatedAt,
    UpdatedAt,
}

const NOTE_COLUMNS: &str = "notes.id, notes.owner, notes.title, notes.content, notes.tags, notes.image_ref, \
                            notes.image_url, notes.created_at, notes.updated_at";

impl<'a> TryFrom<&Row<'a>> for Note {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        let tags: serde_json::Value = row.get(4)?;
        let tags = serde_json::from_value(tags)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            tags,
            image_ref: row.get(5)?,
            image_url: row.get(6)?,
            display_image_url: None,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

fn with_display_image(conn: &Connection, mut note: Note) -> rusqlite::Result<Note> {
    note.display_image_url = match note.image_ref {
        Some(storage_id) => storage::resolve_url(conn, &storage_id)?,
        None => note.image_url.clone(),
    };
    Ok(note)
}

fn with_display_images(conn: &Connection, notes: Vec<Note>) -> rusqlite::Result<Vec<Note>> {
    notes.into_iter().map(|note| with_display_image(conn, note)).collect()
}

/// Owner's notes, newest first, optionally restricted to an exact tag.
fn select_owned(conn: &Connection, owner: UserId, tag: Option<String>) -> rusqlite::Result<Vec<Note>> {
    let (sql, values) = Query::select()
        .columns({
            use Notes::*;
            [Id, Owner, Title, Content, Tags, ImageRef, ImageUrl, CreatedAt, UpdatedAt]
        })
        .from(Notes::Table)
        .and_where(Expr::col(Notes::Owner).eq(owner))
        .and_where_option(tag.map(|tag| {
            Expr::cust_with_values(
                "EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value = ?)",
                [tag],
            )
        }))
        .order_by(Notes::CreatedAt, Order::Desc)
        .order_by_expr(Expr::cust("notes.seq"), Order::Desc)
        .build_rusqlite(SqliteQueryBuilder);

    let notes = conn
        .prepare(&sql)?
        .query_map(&*values.as_params(), |row| Note::try_from(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    with_display_images(conn, notes)
}

fn select_matching(
    conn: &Connection,
    owner: UserId,
    index: FullTextIndex,
    expression: &str,
) -> rusqlite::Result<Vec<Note>> {
    let table = index.table();
    let sql = format!(
        "SELECT {NOTE_COLUMNS} FROM {table} JOIN notes ON notes.seq = {table}.rowid
        WHERE {table} MATCH ? AND notes.owner = ?
        ORDER BY {table}.rank"
    );

    let notes = conn
        .prepare_cached(&sql)?
        .query_map(params![expression, owner], |row| Note::try_from(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(notes)
}

fn not_found_or_forbidden(error: db::Error) -> Error {
    match error {
        db::Error::NotFound(_) => Error::NotFoundOrForbidden,
        error => Error::from(error),
    }
}

pub async fn list_notes(BaseParams { db, ctx }: BaseParams) -> Result<FindNotesResponse> {
    let Some(owner) = ctx.get_user_id() else {
        return Ok(FindNotesResponse::default());
    };

    db.call(move |conn| {
        let notes = select_owned(conn, owner, None)?;
        Ok(FindNotesResponse { results: notes })
    })
    .await
    .map_err(db::Error::from)
    .map_err(Error::from)
}

pub async fn search_notes(
    SearchNotesQuery { query, tag }: SearchNotesQuery,
    BaseParams { db, ctx }: BaseParams,
) -> Result<FindNotesResponse> {
    let Some(owner) = ctx.get_user_id() else {
        return Ok(FindNotesResponse::default());
    };

    if query.trim().is_empty() {
        return db
            .call(move |conn| {
                let notes = select_owned(conn, owner, tag)?;
                Ok(FindNotesResponse { results: notes })
            })
            .await
            .map_err(db::Error::from)
            .map_err(Error::from);
    }

    let Some(expression) = search::match_expression(&query) else {
        return Ok(FindNotesResponse::default());
    };

    db.call(move |conn| {
        let by_title = select_matching(conn, owner, FullTextIndex::Title, &expression)?;
        let by_content = select_matching(conn, owner, FullTextIndex::Content, &expression)?;

        let notes = search::merge_hits(by_title, by_content, tag.as_deref());
        Ok(FindNotesResponse {
            results: with_display_images(conn, notes)?,
        })
    })
    .await
    .map_err(db::Error::from)
    .map_err(Error::from)
}

pub async fn get_note(note_id: NoteId, BaseParams { db, ctx }: BaseParams) -> Result<Note> {
    let owner = ctx.require_user_id()?;

    db.call(move |conn| {
        let note = conn.query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ? AND owner = ?"),
            params![note_id, owner],
            |row| Note::try_from(row),
        )?;
        Ok(with_display_image(conn, note)?)
    })
    .await
    .map_err(db::Error::from)
    .map_err(not_found_or_forbidden)
}

pub async fn create_note(
    NoteFields {
        title,
        content,
        tags,
        image,
    }: NoteFields,
    BaseParams { db, ctx }: BaseParams,
) -> Result<CreateNoteResponse> {
    let owner = ctx.require_user_id()?;
    let (image_ref, image_url) = image.into_columns();
    let tags = serde_json::Value::from(tags);

    let id = db
        .call(move |conn| {
            conn.query_row(
                r#"INSERT INTO notes (owner, title, content, tags, image_ref, image_url, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING id"#,
                params![owner, title, content, tags, image_ref, image_url, Utc::now()],
                |row| row.get::<_, NoteId>(0),
            )
            .map_err(|e| e.into())
        })
        .await
        .map_err(db::Error::from)
        .map_err(Error::from)?;

    tracing::debug!("note {id} created by {owner}");

    Ok(CreateNoteResponse { id })
}

/// Replaces every writable field of an owned note.
pub async fn update_note(
    note_id: NoteId,
    NoteFields {
        title,
        content,
        tags,
        image,
    }: NoteFields,
    BaseParams { db, ctx }: BaseParams,
) -> Result<()> {
    let owner = ctx.require_user_id()?;
    let (image_ref, image_url) = image.into_columns();
    let tags = serde_json::Value::from(tags);

    db.call(move |conn| {
        conn.query_row(
            r#"UPDATE notes SET title = ?, content = ?, tags = ?, image_ref = ?, image_url = ?, updated_at = ?
            WHERE id = ? AND owner = ?
            RETURNING id"#,
            params![title, content, tags, image_ref, image_url, Utc::now(), note_id, owner],
            |row| row.get::<_, NoteId>(0),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(not_found_or_forbidden)?;

    Ok(())
}

pub async fn delete_note(note_id: NoteId, BaseParams { db, ctx }: BaseParams) -> Result<()> {
    let owner = ctx.require_user_id()?;

    db.call(move |conn| {
        conn.query_row(
            "DELETE FROM notes WHERE id = ? AND owner = ? RETURNING id",
            params![note_id, owner],
            |row| row.get::<_, NoteId>(0),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(not_found_or_forbidden)?;

    tracing::debug!("note {note_id} deleted by {owner}");

    Ok(())
}

pub async fn list_tags(BaseParams { db, ctx }: BaseParams) -> Result<TagsResponse> {
    let Some(owner) = ctx.get_user_id() else {
        return Ok(TagsResponse::default());
    };

    db.call(move |conn| {
        let tags = conn
            .prepare(
                r#"SELECT DISTINCT json_each.value FROM notes, json_each(notes.tags)
                WHERE notes.owner = ?
                ORDER BY json_each.value"#,
            )?
            .query_map(params![owner], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(TagsResponse { results: tags })
    })
    .await
    .map_err(db::Error::from)
    .map_err(Error::from)
}
