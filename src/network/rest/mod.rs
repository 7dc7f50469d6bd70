pub mod handlers;
pub mod server;

pub use handlers::{create_router, ApiError, ApiResponse, AppState};
pub use server::{RestServer, RunningServer};
