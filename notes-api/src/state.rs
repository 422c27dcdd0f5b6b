use axum::extract::FromRef;

use crate::db::DB;

/// Router state shared by the notes and storage routers.
#[derive(FromRef, Clone)]
pub struct AppState {
    pub db: DB,
}

impl AppState {
    pub fn new(db: DB) -> Self {
        Self { db }
    }
}
