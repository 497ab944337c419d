use crate::message::{NotifyLevel, NotifyMessage};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// 通知错误
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// 通知渠道接口
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, message: &NotifyMessage) -> Result<(), ChannelError>;
    fn name(&self) -> &str;
}

/// 邮件渠道（简化实现）
pub struct EmailChannel {
    recipients: Vec<String>,
}

impl EmailChannel {
    pub fn new(recipients: Vec<String>) -> Self {
        Self { recipients }
    }

    fn format_body(&self, message: &NotifyMessage) -> String {
        let mut body = format!("{}\n\n", message.title);
        body.push_str(&format!("Level: {:?}\n", message.level));
        body.push_str(&format!("Time: {}\n\n", message.timestamp));
        body.push_str(&message.content);
        body
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, message: &NotifyMessage) -> Result<(), ChannelError> {
        // 简化实现：投递本身是外部协作方，这里只组装并记录
        let mut to = self.recipients.clone();
        to.extend(message.additional_recipients.iter().cloned());

        info!(
            recipients = ?to,
            title = %message.title,
            "Email notification dispatched: {}",
            self.format_body(message).lines().next().unwrap_or("")
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}

/// 聊天 Webhook 渠道
pub struct ChatWebhookChannel {
    webhook_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatPayload<'a> {
    title: String,
    text: &'a str,
    level: &'static str,
    timestamp: String,
}

impl ChatWebhookChannel {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }

    fn build_payload<'a>(&self, message: &'a NotifyMessage) -> ChatPayload<'a> {
        let (emoji, level) = match message.level {
            NotifyLevel::Critical => ("🚨", "critical"),
            NotifyLevel::Warning => ("⚠️", "warning"),
            NotifyLevel::Info => ("ℹ️", "info"),
        };

        ChatPayload {
            title: format!("{} {}", emoji, message.title),
            text: &message.content,
            level,
            timestamp: message.timestamp.to_rfc3339(),
        }
    }
}

#[async_trait]
impl NotificationChannel for ChatWebhookChannel {
    async fn send(&self, message: &NotifyMessage) -> Result<(), ChannelError> {
        let payload = serde_json::to_string(&self.build_payload(message))
            .map_err(|e| ChannelError::Serialization(e.to_string()))?;

        self.client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        info!("Chat notification sent to {}", self.webhook_url);
        Ok(())
    }

    fn name(&self) -> &str {
        "chat"
    }
}

/// 升级邮件渠道
///
/// 与普通邮件渠道相同的组装逻辑，但总是并入升级收件人。
pub struct EscalationEmailChannel {
    recipients: Vec<String>,
    escalation_recipients: Vec<String>,
}

impl EscalationEmailChannel {
    pub fn new(recipients: Vec<String>, escalation_recipients: Vec<String>) -> Self {
        Self {
            recipients,
            escalation_recipients,
        }
    }
}

#[async_trait]
impl NotificationChannel for EscalationEmailChannel {
    async fn send(&self, message: &NotifyMessage) -> Result<(), ChannelError> {
        let mut to = self.recipients.clone();
        to.extend(self.escalation_recipients.iter().cloned());
        to.extend(message.additional_recipients.iter().cloned());

        info!(
            recipients = ?to,
            title = %message.title,
            "Escalation email dispatched"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "escalation-email"
    }
}
