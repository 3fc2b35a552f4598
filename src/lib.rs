pub mod app;
pub mod config;
pub mod controller;
pub mod gateway;
pub mod handler;
pub mod links;
pub mod model;
pub mod state;
pub mod tips;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use config::Config;
pub use controller::{ConversationController, SubmitRejected};
pub use gateway::{ChunkSink, GatewayError, GatewayEvent, GeminiGateway, InferenceGateway};
pub use model::ModelOption;
pub use state::{ChatMessage, ChatRole};
pub use tips::TipRotator;
