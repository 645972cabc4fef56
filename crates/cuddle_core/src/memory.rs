use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::notifications::{
    AlertStyle, AuthorizationOptions, AuthorizationStatus, DeliveredRecord, NotificationCategory,
    NotificationRequest, NotificationSetting, NotificationSettingsSnapshot, NotificationStore,
    PendingRequestRecord,
};
use crate::random;

#[derive(Debug, Clone)]
struct PendingEntry {
    request: NotificationRequest,
    fire_date: DateTime<Utc>,
}

#[derive(Debug)]
struct MemoryState {
    authorization: AuthorizationStatus,
    grant_on_request: bool,
    device: NotificationSettingsSnapshot,
    categories: Vec<NotificationCategory>,
    pending: Vec<PendingEntry>,
    delivered: Vec<DeliveredRecord>,
}

/// In-process notification center used by the terminal front end and tests.
#[derive(Debug)]
pub struct MemoryNotificationStore {
    state: RwLock<MemoryState>,
    image_pool: Vec<String>,
}

impl MemoryNotificationStore {
    pub fn new(image_pool_size: u32) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                authorization: AuthorizationStatus::NotDetermined,
                grant_on_request: true,
                device: NotificationSettingsSnapshot {
                    authorization_status: AuthorizationStatus::NotDetermined,
                    notification_center: NotificationSetting::Enabled,
                    sound: NotificationSetting::Enabled,
                    badge: NotificationSetting::Enabled,
                    alert: NotificationSetting::Enabled,
                    lock_screen: NotificationSetting::Enabled,
                    car_play: NotificationSetting::NotSupported,
                    alert_style: AlertStyle::Banner,
                },
                categories: Vec::new(),
                pending: Vec::new(),
                delivered: Vec::new(),
            }),
            image_pool: random::image_pool(image_pool_size),
        }
    }

    /// Whether a later authorization prompt is accepted.
    pub fn grant_on_request(self, grant: bool) -> Self {
        self.state.write().grant_on_request = grant;
        self
    }

    pub fn authorized(self) -> Self {
        self.state.write().authorization = AuthorizationStatus::Authorized;
        self
    }

    pub fn categories(&self) -> Vec<NotificationCategory> {
        self.state.read().categories.clone()
    }

    pub fn pending_requests(&self) -> Vec<NotificationRequest> {
        self.state
            .read()
            .pending
            .iter()
            .map(|entry| entry.request.clone())
            .collect()
    }

    /// Moves every pending request due at `now` to the delivered list.
    pub fn deliver_due(&self, now: DateTime<Utc>) -> Vec<DeliveredRecord> {
        let mut state = self.state.write();
        let (due, waiting): (Vec<PendingEntry>, Vec<PendingEntry>) = std::mem::take(&mut state.pending)
            .into_iter()
            .partition(|entry| entry.fire_date <= now);
        state.pending = waiting;
        let delivered: Vec<DeliveredRecord> = due
            .into_iter()
            .map(|entry| DeliveredRecord {
                delivered_at: entry.fire_date,
                identifier: entry.request.identifier,
                title: entry.request.content.title,
            })
            .collect();
        state.delivered.extend(delivered.iter().cloned());
        if !delivered.is_empty() {
            info!(count = delivered.len(), "notifications delivered");
        }
        delivered
    }
}

impl Default for MemoryNotificationStore {
    fn default() -> Self {
        Self::new(random::IMAGE_POOL_SIZE)
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn request_authorization(
        &self,
        options: AuthorizationOptions,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write();
        if state.authorization == AuthorizationStatus::NotDetermined {
            state.authorization = if state.grant_on_request {
                AuthorizationStatus::Authorized
            } else {
                AuthorizationStatus::Denied
            };
            debug!(?options, status = ?state.authorization, "authorization resolved");
        }
        Ok(state.authorization == AuthorizationStatus::Authorized)
    }

    async fn set_categories(&self, categories: Vec<NotificationCategory>) {
        self.state.write().categories = categories;
    }

    async fn submit(&self, request: NotificationRequest) -> Result<(), StoreError> {
        if let Some(attachment) = request
            .content
            .attachments
            .iter()
            .find(|a| !self.image_pool.contains(&a.identifier))
        {
            return Err(StoreError::InvalidAttachment(attachment.identifier.clone()));
        }
        let mut state = self.state.write();
        if state.authorization != AuthorizationStatus::Authorized {
            return Err(StoreError::NotAuthorized);
        }
        let fire_date = request
            .trigger
            .fire_date(Utc::now())
            .ok_or_else(|| {
                StoreError::InvalidTrigger(format!(
                    "{} fires after {}s",
                    request.identifier, request.trigger.interval_secs
                ))
            })?;
        state
            .pending
            .retain(|entry| entry.request.identifier != request.identifier);
        state.pending.push(PendingEntry { request, fire_date });
        Ok(())
    }

    async fn settings(&self) -> Result<NotificationSettingsSnapshot, StoreError> {
        let state = self.state.read();
        Ok(NotificationSettingsSnapshot {
            authorization_status: state.authorization,
            ..state.device
        })
    }

    async fn pending(&self) -> Result<Vec<PendingRequestRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .pending
            .iter()
            .map(|entry| PendingRequestRecord {
                identifier: entry.request.identifier.clone(),
                title: entry.request.content.title.clone(),
                next_trigger_date: entry.fire_date,
            })
            .collect())
    }

    async fn delivered(&self) -> Result<Vec<DeliveredRecord>, StoreError> {
        Ok(self.state.read().delivered.clone())
    }

    async fn cancel_pending(&self, identifiers: &[String]) {
        self.state
            .write()
            .pending
            .retain(|entry| !identifiers.contains(&entry.request.identifier));
    }
}
