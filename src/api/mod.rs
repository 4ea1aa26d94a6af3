pub mod handlers;
pub mod pages;
pub mod server;

pub use handlers::AppState;
pub use server::{build_router, build_state, run_server};
