use crate::channel::NotificationChannel;
use crate::message::NotifyMessage;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// 通知管理器
///
/// 按渠道名分发；单个渠道失败只记录日志，不影响其他渠道。
pub struct NotifyManager {
    channels: HashMap<String, Box<dyn NotificationChannel>>,
}

impl NotifyManager {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    /// 注册通知渠道
    pub fn register(&mut self, channel: Box<dyn NotificationChannel>) {
        info!("Registered notification channel: {}", channel.name());
        self.channels.insert(channel.name().to_string(), channel);
    }

    /// 向指定渠道集合发送，返回成功的渠道名
    pub async fn dispatch(&self, channel_names: &[String], message: &NotifyMessage) -> Vec<String> {
        let mut delivered = Vec::new();

        for name in channel_names {
            let Some(channel) = self.channels.get(name) else {
                warn!(channel = %name, "Unknown notification channel, skipping");
                continue;
            };

            match channel.send(message).await {
                Ok(()) => {
                    info!(channel = %name, title = %message.title, "Notification sent");
                    delivered.push(name.clone());
                }
                Err(e) => {
                    error!(channel = %name, error = %e, "Notification failed");
                }
            }
        }

        delivered
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for NotifyManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelError, EmailChannel};
    use async_trait::async_trait;

    struct FailingChannel;

    #[async_trait]
    impl NotificationChannel for FailingChannel {
        async fn send(&self, _message: &NotifyMessage) -> Result<(), ChannelError> {
            Err(ChannelError::Http("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "chat"
        }
    }

    #[tokio::test]
    async fn test_dispatch_isolates_failures() {
        let mut manager = NotifyManager::new();
        manager.register(Box::new(EmailChannel::new(vec![
            "admin@example.com".to_string(),
        ])));
        manager.register(Box::new(FailingChannel));

        let message = NotifyMessage::critical("Alert", "something broke");
        let delivered = manager
            .dispatch(
                &["email".to_string(), "chat".to_string()],
                &message,
            )
            .await;

        // 失败的渠道不会阻断其他渠道
        assert_eq!(delivered, vec!["email".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_skips_unknown_channel() {
        let manager = NotifyManager::new();
        let message = NotifyMessage::info("Test", "no channels registered");

        let delivered = manager.dispatch(&["pager".to_string()], &message).await;
        assert!(delivered.is_empty());
    }
}
