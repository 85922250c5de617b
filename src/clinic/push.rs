use std::sync::Arc;

use async_trait::async_trait;

use super::{DeliveryError, NotificationEvent, PushSender};
use crate::messaging::models::{Message, Notification, WebpushConfig, WebpushNotification};
use crate::messaging::FirebaseMessaging;

/// Icon shown by the browser for queue notifications, served by the static front-end.
pub const NOTIFICATION_ICON: &str = "/logo.jpeg";

/// Delivers queue notifications through Firebase Cloud Messaging.
#[derive(Clone)]
pub struct FcmPushSender {
    messaging: Arc<FirebaseMessaging>,
}

impl FcmPushSender {
    pub fn new(messaging: Arc<FirebaseMessaging>) -> Self {
        Self { messaging }
    }
}

pub(crate) fn message_for(event: &NotificationEvent) -> Message {
    Message {
        webpush: Some(WebpushConfig {
            notification: Some(WebpushNotification {
                icon: Some(NOTIFICATION_ICON.to_string()),
            }),
        }),
        ..Message::to_token(
            event.token.clone(),
            Notification {
                title: Some(event.title.clone()),
                body: Some(event.body.clone()),
                image: None,
            },
        )
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    async fn send(&self, event: &NotificationEvent) -> Result<String, DeliveryError> {
        Ok(self.messaging.send(&message_for(event)).await?)
    }
}
