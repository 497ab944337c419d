pub mod channel;
pub mod manager;
pub mod message;

pub use channel::{
    ChannelError, ChatWebhookChannel, EmailChannel, EscalationEmailChannel, NotificationChannel,
};
pub use manager::NotifyManager;
pub use message::{NotifyLevel, NotifyMessage};
