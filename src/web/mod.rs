pub mod error;
pub mod protocol;
pub mod routes;
pub mod server;

pub use error::AppError;
pub use routes::{create_router, AppState, ChatMode};
pub use server::WebServer;
