use aide::{
    generate::GenContext,
    openapi::{MediaType, Operation, Response, SchemaObject},
    operation::OperationIo,
    OperationOutput,
};
use axum::response::IntoResponse;
use axum_macros::{FromRequest, FromRequestParts};
use indexmap::IndexMap;
use serde::Serialize;

pub use aide;
pub use aide::openapi::OpenApi;

use crate::errors::{ErrorCode, ErrorResponseDocs};

/// JSON body whose rejection renders as `crate::Error`.
#[derive(FromRequest, OperationIo)]
#[from_request(via(axum::Json), rejection(crate::Error))]
#[aide(input_with = "axum::Json<T>", output_with = "axum::Json<T>", json_schema)]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(FromRequestParts, OperationIo)]
#[from_request(via(axum::extract::Query), rejection(crate::Error))]
#[aide(input_with = "axum::extract::Query<T>", json_schema)]
pub struct Query<T>(pub T);

#[derive(FromRequestParts, OperationIo)]
#[from_request(via(axum::extract::Path), rejection(crate::Error))]
#[aide(input_with = "axum::extract::Path<T>", json_schema)]
pub struct Path<T>(pub T);

impl OperationOutput for crate::Error {
    type Inner = ();

    fn operation_response(ctx: &mut GenContext, _operation: &mut Operation) -> Option<Response> {
        Some(error_response(ctx, "Error".into()))
    }

    /// One response per status, described by the error codes sharing it.
    fn inferred_responses(ctx: &mut GenContext, _operation: &mut Operation) -> Vec<(Option<u16>, Response)> {
        let mut by_status: IndexMap<u16, Vec<&str>> = IndexMap::new();
        for code in ErrorCode::ALL {
            by_status.entry(code.status().as_u16()).or_default().push(code.as_str());
        }

        by_status
            .into_iter()
            .map(|(status, codes)| (Some(status), error_response(ctx, codes.join(", "))))
            .collect()
    }
}

fn error_response(ctx: &mut GenContext, description: String) -> Response {
    let schema = ctx.schema.subschema_for::<ErrorResponseDocs>();

    Response {
        description,
        content: IndexMap::from_iter([(
            "application/json".into(),
            MediaType {
                schema: Some(SchemaObject {
                    json_schema: schema,
                    example: None,
                    external_docs: None,
                }),
                ..Default::default()
            },
        )]),
        ..Default::default()
    }
}
