use super::types::{
    ApiResponse, GetUpdatesRequest, Message, ParseMode, ReplyKeyboardMarkup, SendMessageRequest,
    Update, User,
};
use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};
use crate::transport::{ChatTransport, InboundEvent};
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Extra time on top of the long-poll timeout before reqwest gives up
const POLL_SLACK: Duration = Duration::from_secs(10);
/// Pause between failed getUpdates calls
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Client for the Telegram Bot API over HTTPS
pub struct TelegramClient {
    http: Client,
    config: TelegramConfig,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.config.api_url)
            .field("poll_timeout_secs", &self.config.poll_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a new client from config
    pub fn new(config: &TelegramConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs) + POLL_SLACK)
            .build()
            .map_err(AppError::http)?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Who the token belongs to. Also proves the token works.
    pub async fn get_me(&self) -> AppResult<User> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates newer than `offset`
    pub async fn get_updates(&self, offset: i64) -> AppResult<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.config.poll_timeout_secs,
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &request).await
    }

    /// Feed inbound events into `tx` until the receiver goes away.
    pub async fn run_poller(&self, tx: mpsc::Sender<InboundEvent>) {
        let mut offset = 0;
        info!("Polling Telegram for updates");

        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("getUpdates failed: {}. Retrying in {:?}", e, RETRY_DELAY);
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(event) = super::event_from_update(update) else {
                    continue;
                };
                if tx.send(event).await.is_err() {
                    info!("Session loop closed, stopping poller");
                    return;
                }
            }
        }
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("Calling Bot API method {}", method);
        let response = self
            .http
            .post(self.config.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(AppError::http)?;

        Self::parse(method, response).await
    }

    async fn parse<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        let body: ApiResponse<T> = response.json().await.map_err(AppError::http)?;

        if !body.ok {
            let err = AppError::Telegram {
                code: body.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: body.description.unwrap_or_default(),
            };
            error!("Bot API method {} failed: {}", method, err);
            return Err(err);
        }

        body.result
            .ok_or_else(|| AppError::internal(format!("{} returned ok without a result", method)))
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> AppResult<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            reply_markup: None,
        };
        self.call::<_, Message>("sendMessage", &request).await?;
        Ok(())
    }

    async fn send_choice(&self, chat_id: i64, prompt: &str, options: &[&str]) -> AppResult<()> {
        let request = SendMessageRequest {
            chat_id,
            text: prompt,
            parse_mode: None,
            reply_markup: Some(ReplyKeyboardMarkup::one_time_row(options)),
        };
        self.call::<_, Message>("sendMessage", &request).await?;
        Ok(())
    }

    async fn send_file(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> AppResult<()> {
        let document = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", document);

        let response = self
            .http
            .post(self.config.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(AppError::http)?;

        Self::parse::<Message>("sendDocument", response).await?;
        Ok(())
    }
}
