use std::sync::Arc;

use axum::{
    extract::{
        rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
        Request,
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use schemars::{
    schema::{Schema, SchemaObject, SubschemaValidation},
    schema_for, JsonSchema,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not_found")]
    NotFound(String),

    // auth
    #[error("unauthenticated")]
    Unauthenticated,
    /// The note does not exist or belongs to someone else.
    #[error("not_found")]
    NotFoundOrForbidden,

    // validation
    #[error("validation")]
    Validation(String),
    #[error("validation")]
    JsonValidation(#[from] JsonRejection),
    #[error("validation")]
    QueryValidation(#[from] QueryRejection),
    #[error("validation")]
    PathValidation(#[from] PathRejection),
    #[error("payload_too_large")]
    PayloadTooLarge,

    #[error(transparent)]
    DB(crate::db::Error),

    #[error("unexpected")]
    Unexpected(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) | Self::NotFoundOrForbidden => ErrorCode::NotFound,
            Self::Unauthenticated => ErrorCode::Unauthenticated,
            Self::Validation(_) => ErrorCode::Validation,
            Self::JsonValidation(_) => ErrorCode::JsonValidation,
            Self::QueryValidation(_) => ErrorCode::QueryValidation,
            Self::PathValidation(_) => ErrorCode::PathValidation,
            Self::PayloadTooLarge => ErrorCode::PayloadTooLarge,
            Self::DB(_) | Self::Unexpected(_) => ErrorCode::Unexpected,
        }
    }

    /// Client-facing message. Storage failures are never described.
    fn public_message(&self) -> String {
        match self {
            Self::NotFound(message) | Self::Validation(message) => message.clone(),
            Self::NotFoundOrForbidden => "Note not found".into(),
            Self::Unauthenticated => "Unauthenticated".into(),
            Self::JsonValidation(rejection) => rejection.body_text(),
            Self::QueryValidation(rejection) => rejection.body_text(),
            Self::PathValidation(rejection) => rejection.body_text(),
            Self::PayloadTooLarge => "Payload too large".into(),
            Self::DB(_) | Self::Unexpected(_) => "Unexpected".into(),
        }
    }
}

/// Raw request bodies. Only the size limit gets its own code.
impl From<BytesRejection> for Error {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::Validation(rejection.body_text())
    }
}

impl From<crate::db::Error> for Error {
    fn from(error: crate::db::Error) -> Self {
        match error {
            crate::db::Error::NotFound(msg) => Self::NotFound(msg),
            error => Self::DB(error),
        }
    }
}

/// crate::Error <--> tokio_rusqlite::Error
///
/// Errors raised inside `Connection::call` travel as `tokio_rusqlite::Error::Other`
/// and are unpacked again on the way out.
pub mod db_mappers {
    use super::*;
    use crate::db::rusqlite;
    use crate::db::tokio_rusqlite;

    impl From<tokio_rusqlite::Error> for Error {
        fn from(error: tokio_rusqlite::Error) -> Self {
            match error {
                tokio_rusqlite::Error::Other(err) => match err.downcast::<Error>() {
                    Ok(err) => *err,
                    Err(err) => Error::DB(tokio_rusqlite::Error::Other(err).into()),
                },
                error => Error::from(crate::db::Error::from(error)),
            }
        }
    }

    impl From<rusqlite::Error> for Error {
        fn from(error: rusqlite::Error) -> Self {
            Error::from(crate::db::Error::from(error))
        }
    }

    impl From<Error> for tokio_rusqlite::Error {
        fn from(error: Error) -> Self {
            tokio_rusqlite::Error::Other(error.into())
        }
    }
}

// Response

macro_rules! error_codes {
    ($($variant:ident => $code:literal, $status:ident;)*) => {
        /// Value of the `error` field of an error body.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum ErrorCode {
            $($variant,)*
        }

        impl ErrorCode {
            pub const ALL: &'static [ErrorCode] = &[$(ErrorCode::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)*
                }
            }

            pub fn status(self) -> StatusCode {
                match self {
                    $(Self::$variant => StatusCode::$status,)*
                }
            }
        }
    };
}

error_codes! {
    NotFound => "not_found", NOT_FOUND;
    PathValidation => "path_validation", BAD_REQUEST;
    QueryValidation => "query_validation", BAD_REQUEST;
    JsonValidation => "json_validation", BAD_REQUEST;
    Validation => "validation", BAD_REQUEST;
    PayloadTooLarge => "payload_too_large", PAYLOAD_TOO_LARGE;
    Unauthenticated => "unauthenticated", UNAUTHORIZED;
    Unexpected => "unexpected", INTERNAL_SERVER_ERROR;
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: Option<String>,
    pub status: u16,
    pub details: Option<Map<String, Value>>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: code.as_str().into(),
            message: Some(message.into()),
            status: code.status().as_u16(),
            details: None,
        }
    }
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        Self::new(error.code(), error.public_message())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.code().status();
        let body = ErrorResponse::from(&self);

        let mut res = (status, axum::Json(body)).into_response();
        res.extensions_mut().insert(Arc::new(self));
        res
    }
}

pub async fn on_error(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let error = response.extensions().get::<Arc<Error>>().map(Arc::as_ref);
    match error {
        Some(error @ (Error::DB(_) | Error::Unexpected(_))) => tracing::error!("{:?}", error),
        Some(error) => tracing::debug!("{:?}", error),
        None => {}
    }

    response
}

/// Documents `ErrorResponse` as one variant per error code, with `error` and
/// `status` pinned.
pub struct ErrorResponseDocs;

impl JsonSchema for ErrorResponseDocs {
    fn schema_name() -> String {
        String::from("ErrorResponse")
    }

    fn json_schema(_: &mut schemars::gen::SchemaGenerator) -> Schema {
        let variants = ErrorCode::ALL
            .iter()
            .map(|code| {
                let mut schema = schema_for!(ErrorResponse).schema;
                let obj = schema.object();
                if let Some(Schema::Object(status)) = obj.properties.get_mut("status") {
                    status.enum_values = Some(vec![Value::from(code.status().as_u16())]);
                }
                if let Some(Schema::Object(error)) = obj.properties.get_mut("error") {
                    error.enum_values = Some(vec![Value::from(code.as_str())]);
                }

                Schema::from(schema)
            })
            .collect::<Vec<_>>();

        SchemaObject {
            subschemas: Some(Box::new(SubschemaValidation {
                one_of: Some(variants),
                ..Default::default()
            })),
            ..Default::default()
        }
        .into()
    }
}
