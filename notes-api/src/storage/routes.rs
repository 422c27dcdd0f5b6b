use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Extension},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing,
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    config::config,
    ctx::BaseParams,
    openapi::{
        aide::{
            axum::{routing::post_with, ApiRouter, IntoApiResponse},
            NoApi,
        },
        Json, Path,
    },
    state::AppState,
    Result, DB,
};

use super::{handlers, StorageId, Upload, UploadTarget};

#[derive(Debug, Deserialize, JsonSchema)]
struct StorageIdPath {
    storage_id: StorageId,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TokenPath {
    token: String,
}

pub fn router(state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/api/v1/storage/upload-target",
            post_with(generate_upload_target, |t| {
                t.description("One-time destination for a blob upload")
                    .response::<200, Json<UploadTarget>>()
            }),
        )
        .route(
            "/api/v1/storage/uploads/{token}",
            routing::post(upload).layer(DefaultBodyLimit::max(config().max_upload_bytes)),
        )
        .route("/api/v1/storage/{storage_id}", routing::get(get_blob))
        .with_state(state)
}

async fn generate_upload_target(NoApi(base): NoApi<BaseParams>) -> impl IntoApiResponse {
    handlers::generate_upload_target(base).await.map(Json)
}

async fn upload(
    Path(TokenPath { token }): Path<TokenPath>,
    Extension(db): Extension<DB>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse> {
    let body = body?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let upload = Upload {
        content_type,
        data: body.to_vec(),
    };

    handlers::upload(token, upload, db)
        .await
        .map(|r| (StatusCode::CREATED, Json(r)))
}

async fn get_blob(
    Path(StorageIdPath { storage_id }): Path<StorageIdPath>,
    Extension(db): Extension<DB>,
) -> Result<impl IntoResponse> {
    let blob = handlers::get_blob(storage_id, db).await?;

    Ok(([(header::CONTENT_TYPE, blob.content_type)], blob.data))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use uuid::Uuid;

    use super::*;
    use crate::{db::init_test_db, errors::ErrorResponse, storage::UploadResponse};

    const USER: &str = "018f6146-32f4-7948-8289-cfb5cdb2b2af";

    #[tokio::test]
    async fn upload_flow() -> Result<()> {
        let server = test_server(init_test_db().await?).await?;

        let target = server
            .post("/api/v1/storage/upload-target")
            .add_header(
                HeaderName::from_static("x-user-id"),
                HeaderValue::from_static(USER),
            )
            .await;
        assert_eq!(target.status_code(), 200);
        let target = target.json::<UploadTarget>();

        let uploaded = server
            .post(&target.upload_url)
            .content_type("image/png")
            .bytes(Bytes::from_static(b"\x89PNG"))
            .await;
        assert_eq!(uploaded.status_code(), 201);
        let UploadResponse { storage_id } = uploaded.json::<UploadResponse>();

        let blob = server.get(&format!("/api/v1/storage/{storage_id}")).await;
        assert_eq!(blob.status_code(), 200);
        assert_eq!(blob.header(header::CONTENT_TYPE), "image/png");
        assert_eq!(blob.as_bytes().as_ref(), b"\x89PNG");

        let reused = server
            .post(&target.upload_url)
            .bytes(Bytes::from_static(b"\x89PNG"))
            .await;
        assert_eq!(reused.status_code(), 404);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_upload() -> Result<()> {
        let server = test_server(init_test_db().await?).await?;

        let target = server
            .post("/api/v1/storage/upload-target")
            .add_header(
                HeaderName::from_static("x-user-id"),
                HeaderValue::from_static(USER),
            )
            .await
            .json::<UploadTarget>();

        let response = server
            .post(&target.upload_url)
            .content_type("image/png")
            .bytes(Bytes::from(vec![0u8; config().max_upload_bytes + 1]))
            .await;

        assert_eq!(response.status_code(), 413);
        assert_eq!(response.json::<ErrorResponse>().error, "payload_too_large");

        let retried = server
            .post(&target.upload_url)
            .content_type("image/png")
            .bytes(Bytes::from_static(b"\x89PNG"))
            .await;
        assert_eq!(retried.status_code(), 201);
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_upload_target() -> Result<()> {
        let server = test_server(init_test_db().await?).await?;

        let response = server.post("/api/v1/storage/upload-target").await;

        assert_eq!(response.status_code(), 401);
        assert_eq!(response.json::<ErrorResponse>().error, "unauthenticated");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_blob() -> Result<()> {
        let server = test_server(init_test_db().await?).await?;

        let response = server.get(&format!("/api/v1/storage/{}", Uuid::now_v7())).await;

        assert_eq!(response.status_code(), 404);
        Ok(())
    }

    async fn test_server(db: DB) -> Result<TestServer> {
        crate::tests::test_server(db, super::router).await
    }
}
