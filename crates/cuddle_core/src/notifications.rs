use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Category attached to every scheduled cuddle.
pub const NEW_CUDDLE_PIX_CATEGORY: &str = "newCuddlePix";
pub const STAR_ACTION: &str = "star";
pub const DISMISS_ACTION: &str = "dismiss";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub identifier: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
    pub category_identifier: String,
}

/// One-shot trigger firing `interval_secs` after submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeIntervalTrigger {
    pub interval_secs: f64,
    pub repeats: bool,
}

impl TimeIntervalTrigger {
    pub fn once(interval_secs: f64) -> Self {
        Self {
            interval_secs: interval_secs.max(0.0),
            repeats: false,
        }
    }

    /// When the trigger fires if armed at `armed_at`. `None` for intervals
    /// that are not finite or land outside the representable date range.
    pub fn fire_date(&self, armed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.interval_secs.is_finite() {
            return None;
        }
        let millis = (self.interval_secs * 1000.0).round();
        if millis.abs() >= i64::MAX as f64 {
            return None;
        }
        let interval = Duration::try_milliseconds(millis as i64)?;
        armed_at.checked_add_signed(interval)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub identifier: String,
    pub content: NotificationContent,
    pub trigger: TimeIntervalTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub identifier: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCategory {
    pub identifier: String,
    pub actions: Vec<NotificationAction>,
}

impl NotificationCategory {
    /// The category offering "star" and "dismiss" on a delivered cuddle.
    pub fn cuddle_pix() -> Self {
        Self {
            identifier: NEW_CUDDLE_PIX_CATEGORY.to_string(),
            actions: vec![
                NotificationAction {
                    identifier: STAR_ACTION.to_string(),
                    title: "🌟 star my cuddle 🌟".to_string(),
                },
                NotificationAction {
                    identifier: DISMISS_ACTION.to_string(),
                    title: "Dismiss".to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationOptions {
    pub alert: bool,
    pub sound: bool,
    pub badge: bool,
}

impl Default for AuthorizationOptions {
    fn default() -> Self {
        Self {
            alert: true,
            sound: true,
            badge: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Denied,
    Authorized,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationSetting {
    #[default]
    NotSupported,
    Disabled,
    Enabled,
}

impl NotificationSetting {
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStyle {
    #[default]
    None,
    Banner,
    Alert,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettingsSnapshot {
    pub authorization_status: AuthorizationStatus,
    pub notification_center: NotificationSetting,
    pub sound: NotificationSetting,
    pub badge: NotificationSetting,
    pub alert: NotificationSetting,
    pub lock_screen: NotificationSetting,
    pub car_play: NotificationSetting,
    pub alert_style: AlertStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequestRecord {
    pub identifier: String,
    pub title: String,
    pub next_trigger_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredRecord {
    pub identifier: String,
    pub title: String,
    pub delivered_at: DateTime<Utc>,
}

/// Platform notification centers implement this trait; the rest of the crate
/// only ever talks to the store through it.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn request_authorization(&self, options: AuthorizationOptions)
        -> Result<bool, StoreError>;

    async fn set_categories(&self, categories: Vec<NotificationCategory>);

    /// Registers a request. A request with an identifier already pending
    /// replaces the earlier one.
    async fn submit(&self, request: NotificationRequest) -> Result<(), StoreError>;

    async fn settings(&self) -> Result<NotificationSettingsSnapshot, StoreError>;

    async fn pending(&self) -> Result<Vec<PendingRequestRecord>, StoreError>;

    async fn delivered(&self) -> Result<Vec<DeliveredRecord>, StoreError>;

    /// Unknown identifiers are ignored.
    async fn cancel_pending(&self, identifiers: &[String]);
}
