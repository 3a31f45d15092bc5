pub mod auth;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod bot;
    pub mod common;
    pub mod health;
    pub mod messages;
    pub mod stats;
}

pub use auth::SharedSecret;
pub use router::{create_router, ApiDoc};
pub use types::AppState;
