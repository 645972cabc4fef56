use serde::{Deserialize, Serialize};

use crate::notifications::{
    AlertStyle, AuthorizationStatus, DeliveredRecord, NotificationSettingsSnapshot,
    PendingRequestRecord,
};

/// Table sections in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionKey {
    Settings,
    Pending,
    Delivered,
}

impl SectionKey {
    pub const ALL: [SectionKey; 3] = [Self::Settings, Self::Pending, Self::Delivered];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Only pending requests can be removed from the list.
    pub fn is_editable(self) -> bool {
        self == Self::Pending
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Settings => "Notification Settings",
            Self::Pending => "Pending Notifications",
            Self::Delivered => "Delivered Notifications",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellContent {
    Toggle { label: String, enabled: bool },
    Detail { title: String, detail: String },
}

/// What the list view needs from a section.
pub trait TableSection {
    fn name(&self) -> &str;
    fn row_count(&self) -> usize;
    fn cell_content(&self, row: usize) -> Option<CellContent>;
}

pub const SETTINGS_ROW_COUNT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSection {
    name: String,
    settings: Option<NotificationSettingsSnapshot>,
}

impl SettingsSection {
    pub fn settings(&self) -> Option<&NotificationSettingsSnapshot> {
        self.settings.as_ref()
    }
}

impl TableSection for SettingsSection {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        if self.settings.is_some() {
            SETTINGS_ROW_COUNT
        } else {
            0
        }
    }

    fn cell_content(&self, row: usize) -> Option<CellContent> {
        let settings = self.settings.as_ref()?;
        let (label, enabled) = match row {
            0 => (
                "Authorisation Status",
                settings.authorization_status == AuthorizationStatus::Authorized,
            ),
            1 => (
                "Show in Notification Center",
                settings.notification_center.is_enabled(),
            ),
            2 => ("Sound Enabled?", settings.sound.is_enabled()),
            3 => ("Badges Enabled?", settings.badge.is_enabled()),
            4 => ("Alerts Enabled?", settings.alert.is_enabled()),
            5 => ("Show on lock screen?", settings.lock_screen.is_enabled()),
            6 => ("Show in Car Play?", settings.car_play.is_enabled()),
            7 => ("Alert banners?", settings.alert_style == AlertStyle::Banner),
            _ => return None,
        };
        Some(CellContent::Toggle {
            label: label.to_string(),
            enabled,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSection {
    name: String,
    requests: Vec<PendingRequestRecord>,
}

impl PendingSection {
    pub fn requests(&self) -> &[PendingRequestRecord] {
        &self.requests
    }

    pub fn identifier_at(&self, row: usize) -> Option<&str> {
        self.requests.get(row).map(|r| r.identifier.as_str())
    }
}

impl TableSection for PendingSection {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.requests.len()
    }

    fn cell_content(&self, row: usize) -> Option<CellContent> {
        self.requests.get(row).map(|request| CellContent::Detail {
            title: request.title.clone(),
            detail: format!("Scheduled: {}", request.next_trigger_date),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredSection {
    name: String,
    notifications: Vec<DeliveredRecord>,
}

impl DeliveredSection {
    pub fn notifications(&self) -> &[DeliveredRecord] {
        &self.notifications
    }
}

impl TableSection for DeliveredSection {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.notifications.len()
    }

    fn cell_content(&self, row: usize) -> Option<CellContent> {
        self.notifications.get(row).map(|n| CellContent::Detail {
            title: n.title.clone(),
            detail: format!("Delivered: {}", n.delivered_at),
        })
    }
}

/// Provider for one section, rebuilt from scratch on every load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionProvider {
    Settings(SettingsSection),
    Pending(PendingSection),
    Delivered(DeliveredSection),
}

impl SectionProvider {
    pub fn settings(settings: NotificationSettingsSnapshot) -> Self {
        Self::Settings(SettingsSection {
            name: SectionKey::Settings.title().to_string(),
            settings: Some(settings),
        })
    }

    pub fn pending(requests: Vec<PendingRequestRecord>) -> Self {
        Self::Pending(PendingSection {
            name: SectionKey::Pending.title().to_string(),
            requests,
        })
    }

    pub fn delivered(notifications: Vec<DeliveredRecord>) -> Self {
        Self::Delivered(DeliveredSection {
            name: SectionKey::Delivered.title().to_string(),
            notifications,
        })
    }

    /// Zero-row provider, installed when a fetch for `key` fails.
    pub fn empty(key: SectionKey) -> Self {
        match key {
            SectionKey::Settings => Self::Settings(SettingsSection {
                name: key.title().to_string(),
                settings: None,
            }),
            SectionKey::Pending => Self::pending(Vec::new()),
            SectionKey::Delivered => Self::delivered(Vec::new()),
        }
    }

    pub fn key(&self) -> SectionKey {
        match self {
            Self::Settings(_) => SectionKey::Settings,
            Self::Pending(_) => SectionKey::Pending,
            Self::Delivered(_) => SectionKey::Delivered,
        }
    }

    fn section(&self) -> &dyn TableSection {
        match self {
            Self::Settings(section) => section,
            Self::Pending(section) => section,
            Self::Delivered(section) => section,
        }
    }

    /// Every row, in order.
    pub fn rows(&self) -> Vec<CellContent> {
        (0..self.row_count())
            .filter_map(|row| self.cell_content(row))
            .collect()
    }
}

impl TableSection for SectionProvider {
    fn name(&self) -> &str {
        self.section().name()
    }

    fn row_count(&self) -> usize {
        self.section().row_count()
    }

    fn cell_content(&self, row: usize) -> Option<CellContent> {
        self.section().cell_content(row)
    }
}
