use crate::{
    ctx::BaseParams,
    openapi::{
        aide::{
            axum::{
                routing::{get, get_with},
                ApiRouter, IntoApiResponse,
            },
            NoApi,
        },
        Json, Path, Query,
    },
    state::AppState,
    Result,
};
use axum::http::StatusCode;

use schemars::JsonSchema;

use serde::Deserialize;

use super::{handlers, CreateNoteResponse, FindNotesResponse, NoteForm, NoteId, SearchNotesQuery};

#[derive(Debug, Deserialize, JsonSchema)]
struct NoteIdPath {
    note_id: NoteId,
}

pub fn router(state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/api/v1/notes",
            get(list_notes).post_with(create_note, |t| t.response::<201, Json<CreateNoteResponse>>()),
        )
        .api_route(
            "/api/v1/notes/search",
            get_with(search_notes, |t| {
                t.description("Full-text search over titles and contents, optionally filtered by tag")
                    .response::<200, Json<FindNotesResponse>>()
            }),
        )
        .api_route(
            "/api/v1/notes/{note_id}",
            get(get_note)
                .put_with(update_note, |t| t.response::<204, ()>())
                .delete_with(delete_note, |t| t.response::<204, ()>()),
        )
        .api_route("/api/v1/tags", get(list_tags))
        .with_state(state)
}

async fn list_notes(NoApi(base): NoApi<BaseParams>) -> impl IntoApiResponse {
    handlers::list_notes(base).await.map(Json)
}

async fn search_notes(
    NoApi(base): NoApi<BaseParams>,
    Query(SearchNotesQuery { query, tag }): Query<SearchNotesQuery>,
) -> impl IntoApiResponse {
    // Forms send an empty value for an unset tag select.
    let tag = tag.filter(|tag| !tag.is_empty());

    handlers::search_notes(SearchNotesQuery { query, tag }, base)
        .await
        .map(Json)
}

async fn create_note(
    NoApi(base): NoApi<BaseParams>,
    Json(form): Json<NoteForm>,
) -> Result<(StatusCode, Json<CreateNoteResponse>)> {
    let fields = form.into_new_note()?;

    handlers::create_note(fields, base)
        .await
        .map(|r| (StatusCode::CREATED, Json(r)))
}

async fn get_note(
    Path(NoteIdPath { note_id }): Path<NoteIdPath>,
    NoApi(base): NoApi<BaseParams>,
) -> impl IntoApiResponse {
    handlers::get_note(note_id, base).await.map(Json)
}

async fn update_note(
    Path(NoteIdPath { note_id }): Path<NoteIdPath>,
    NoApi(base): NoApi<BaseParams>,
    Json(form): Json<NoteForm>,
) -> Result<(StatusCode, ())> {
    form.validate()?;

    let previous = handlers::get_note(note_id, base.clone()).await?;
    let fields = form.into_replacement(&previous.image());

    handlers::update_note(note_id, fields, base).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

async fn delete_note(
    Path(NoteIdPath { note_id }): Path<NoteIdPath>,
    NoApi(base): NoApi<BaseParams>,
) -> Result<(StatusCode, ())> {
    handlers::delete_note(note_id, base).await?;

    Ok((StatusCode::NO_CONTENT, ()))
}

async fn list_tags(NoApi(base): NoApi<BaseParams>) -> impl IntoApiResponse {
    handlers::list_tags(base).await.map(Json)
}
