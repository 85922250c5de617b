use serde::{Deserialize, Serialize};

/// A message to be sent via FCM.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Basic notification template to use across all platforms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,

    /// Webpush protocol options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<WebpushConfig>,

    /// Registration token to send a message to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Topic name to send a message to, without the "/topics/" prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Condition to send a message to, e.g. "'foo' in topics && 'bar' in topics".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Message {
    /// A notification message addressed to a single registration token.
    pub fn to_token(token: impl Into<String>, notification: Notification) -> Self {
        Self {
            token: Some(token.into()),
            notification: Some(notification),
            ..Self::default()
        }
    }
}

/// Basic notification template to use across all platforms.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// URL of an image shown in the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Webpush protocol options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebpushConfig {
    /// Web Notification options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<WebpushNotification>,
}

/// The subset of the Web Notification API options the browser front-end reads.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebpushNotification {
    /// Icon URL, relative to the page origin or absolute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendResponseInternal {
    pub name: String,
}
