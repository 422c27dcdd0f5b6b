mod handlers;
mod model;
mod routes;

pub use handlers::resolve_url;
pub use model::*;
pub use routes::router;
