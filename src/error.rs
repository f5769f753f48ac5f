use std::path::PathBuf;
use thiserror::Error;

/// Application-wide error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error {code}: {description}")]
    Telegram { code: i64, description: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap a reqwest error without its URL. Bot API URLs carry the token.
    pub fn http(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Everything that can end the handling of a single inbound event.
///
/// None of these are fatal: the session loop logs them, replies when
/// [`RequestError::user_message`] says so and moves on to the next event.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("actor {actor_id} is not allow-listed")]
    AuthorizationDenied { actor_id: i64 },

    #[error("unrecognized command: /{0}")]
    UnrecognizedCommand(String),

    #[error("unrecognized VPN choice: {0:?}")]
    UnrecognizedChoice(String),

    #[error("VPN choice {0:?} received without a pending /get_vpn menu")]
    ChoiceNotOffered(String),

    #[error("generator failed for {client_name}: {diagnostic}")]
    GenerationFailed {
        client_name: String,
        diagnostic: String,
    },

    #[error("artifact not found after generation: {}", .path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("failed to read artifact {}: {source}", .path.display())]
    ArtifactUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to deliver artifact: {0}")]
    DeliveryFailed(#[source] AppError),

    #[error("failed to remove {}: {source}", .path.display())]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Keeps a generator diagnostic reply under Telegram's 4096 character limit.
/// The full text is still logged.
const MAX_DIAGNOSTIC_CHARS: usize = 3500;

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}... (truncated)", &text[..end]),
        None => text.to_string(),
    }
}

impl RequestError {
    /// The reply the actor sees, or `None` when the error is only logged.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::AuthorizationDenied { .. } => {
                Some("Sorry, you are not allowed to use this bot.".to_string())
            }
            Self::UnrecognizedCommand(_) => Some("Unknown command. Use /help.".to_string()),
            Self::UnrecognizedChoice(_) => {
                Some("Unknown VPN choice. Please use the buttons.".to_string())
            }
            Self::ChoiceNotOffered(_) => {
                Some("Please use /get_vpn first and pick a VPN type from the menu.".to_string())
            }
            // Diagnostic text goes to the operator verbatim; redact here for multi-tenant use.
            Self::GenerationFailed { diagnostic, .. } => Some(format!(
                "Error while generating the config: {}. Please contact the administrator.",
                truncate_chars(diagnostic, MAX_DIAGNOSTIC_CHARS)
            )),
            Self::ArtifactMissing { .. } => Some(
                "An error occurred while creating the config file. \
                 Please try again later or contact the administrator."
                    .to_string(),
            ),
            Self::ArtifactUnreadable { .. } => Some(
                "Could not read the config file. Please contact the administrator.".to_string(),
            ),
            Self::DeliveryFailed(_) | Self::CleanupFailed { .. } => None,
        }
    }
}
