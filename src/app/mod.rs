pub mod liveness;
pub mod message_service;

pub use liveness::{HttpStatusProbe, LivenessPinger, StatusProbe};
pub use message_service::MessageService;
