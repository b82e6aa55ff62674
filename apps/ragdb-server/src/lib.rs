pub mod chat;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod router;
pub mod state;

pub use router::router;
pub use state::AppState;
