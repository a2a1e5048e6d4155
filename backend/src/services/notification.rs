//! Best-effort announcements of state changes.
//!
//! A toggle hands its message to a [`NotificationDispatcher`], which queues
//! it for a detached worker task. Delivery outcomes are logged and never
//! reach the request that caused them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the dispatcher queue.
pub const QUEUE_CAPACITY: usize = 64;

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(String),
    #[error("notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A sink for human-readable messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Message announcing the new state, attributed when a name is known.
pub fn state_change_message(is_open: bool, actor: Option<&str>) -> String {
    let mut message = if is_open {
        "🟢 sede aperta".to_string()
    } else {
        "🔴 sede chiusa".to_string()
    };
    if let Some(name) = actor.filter(|n| !n.is_empty()) {
        message.push_str(" da ");
        message.push_str(name);
    }
    message
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
}

/// Telegram Bot API sink.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: i64,
    thread_id: Option<i64>,
}

impl TelegramNotifier {
    /// `thread_id` of 0 posts to the chat's main thread.
    pub fn new(token: &str, chat_id: i64, thread_id: i64) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", TELEGRAM_API, token),
            chat_id,
            thread_id: (thread_id != 0).then_some(thread_id),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
                message_thread_id: self.thread_id,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<empty response>".to_string());
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Queue in front of a [`Notifier`].
///
/// Cloning shares the queue. The worker exits once every clone is dropped.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<String>,
}

impl NotificationDispatcher {
    /// Spawn the worker on the current tokio runtime.
    pub fn start(notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<String>(QUEUE_CAPACITY);

        let worker = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                match notifier.send(&message).await {
                    Ok(()) => debug!("Notification delivered: {}", message),
                    Err(e) => warn!("Notification failed: {}", e),
                }
            }
            info!("Notification worker stopped");
        });

        (Self { sender }, worker)
    }

    /// Queue a message without waiting. A full or closed queue drops it.
    pub fn dispatch(&self, message: String) {
        if let Err(e) = self.sender.try_send(message) {
            match e {
                mpsc::error::TrySendError::Full(msg) => {
                    warn!("Notification queue full, dropping: {}", msg)
                }
                mpsc::error::TrySendError::Closed(msg) => {
                    warn!("Notification worker gone, dropping: {}", msg)
                }
            }
        }
    }
}
