pub mod auth;
pub mod bot;
pub mod config;
pub mod error;
pub mod telegram;
pub mod transport;
pub mod vpn;

pub use config::AppConfig;
pub use error::{AppError, AppResult, RequestError};
