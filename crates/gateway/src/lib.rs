pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod server;
pub mod state;
pub mod storage;

pub use error::ApiError;
pub use server::{router, run_server};
pub use state::AppState;
pub use storage::Storage;
