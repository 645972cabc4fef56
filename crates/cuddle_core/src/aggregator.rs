//! Loads the three notification sections from the store and installs them
//! into a [`SectionRegistry`] once all fetches have reported.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::barrier::CompletionBarrier;
use crate::error::SectionError;
use crate::notifications::NotificationStore;
use crate::registry::SectionRegistry;
use crate::section::{SectionKey, SectionProvider};

/// Boxed completion handed to the load and delete entry points.
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Emitted when section data has changed and the list should be redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChanged;

#[derive(Clone)]
pub struct NotificationDataSource {
    store: Arc<dyn NotificationStore>,
    registry: Arc<SectionRegistry>,
    changes: broadcast::Sender<DataChanged>,
}

impl NotificationDataSource {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self::with_registry(store, Arc::new(SectionRegistry::new()))
    }

    pub fn with_registry(store: Arc<dyn NotificationStore>, registry: Arc<SectionRegistry>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store,
            registry,
            changes,
        }
    }

    pub fn registry(&self) -> &Arc<SectionRegistry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataChanged> {
        self.changes.subscribe()
    }

    /// Returns the number of subscribers reached.
    pub fn notify_changed(&self) -> usize {
        self.changes.send(DataChanged).unwrap_or_default()
    }

    /// Fetches settings, pending and delivered data concurrently.
    ///
    /// All three providers are installed together once every fetch has
    /// reported, then `on_complete` runs; without one, [`DataChanged`] is
    /// broadcast instead. A failed or aborted fetch installs an empty section.
    /// Each call has its own barrier, so overlapping loads are allowed and the
    /// last one to finish wins. Must be called from within a Tokio runtime.
    #[instrument(skip_all)]
    pub fn load_all(&self, on_complete: Option<Completion>) {
        let staged: Arc<Mutex<Vec<SectionProvider>>> =
            Arc::new(Mutex::new(Vec::with_capacity(SectionKey::ALL.len())));

        let barrier = {
            let staged = staged.clone();
            let registry = self.registry.clone();
            let changes = self.changes.clone();
            CompletionBarrier::new(SectionKey::ALL.len(), move || {
                let providers = std::mem::take(&mut *staged.lock());
                registry.replace_all(providers);
                info!(sections = registry.count(), "notification data loaded");
                match on_complete {
                    Some(on_complete) => on_complete(),
                    None => {
                        let receivers = changes.send(DataChanged).unwrap_or_default();
                        debug!(receivers, "data change broadcast");
                    }
                }
            })
        };

        let store = self.store.clone();
        Self::stage(&barrier, &staged, SectionKey::Settings, async move {
            match store.settings().await {
                Ok(settings) => SectionProvider::settings(settings),
                Err(err) => {
                    warn!(%err, "failed to fetch notification settings");
                    SectionProvider::empty(SectionKey::Settings)
                }
            }
        });

        let store = self.store.clone();
        Self::stage(&barrier, &staged, SectionKey::Pending, async move {
            match store.pending().await {
                Ok(requests) => SectionProvider::pending(requests),
                Err(err) => {
                    warn!(%err, "failed to fetch pending notifications");
                    SectionProvider::empty(SectionKey::Pending)
                }
            }
        });

        let store = self.store.clone();
        Self::stage(&barrier, &staged, SectionKey::Delivered, async move {
            match store.delivered().await {
                Ok(notifications) => SectionProvider::delivered(notifications),
                Err(err) => {
                    warn!(%err, "failed to fetch delivered notifications");
                    SectionProvider::empty(SectionKey::Delivered)
                }
            }
        });
    }

    fn stage(
        barrier: &Arc<CompletionBarrier>,
        staged: &Arc<Mutex<Vec<SectionProvider>>>,
        key: SectionKey,
        fetch: impl Future<Output = SectionProvider> + Send + 'static,
    ) {
        let barrier = barrier.clone();
        let staged = staged.clone();
        tokio::spawn(async move {
            // The fetch runs in its own task so a panicking store still
            // reports to the barrier.
            let provider = match tokio::spawn(fetch).await {
                Ok(provider) => provider,
                Err(err) => {
                    warn!(%err, ?key, "section fetch aborted");
                    SectionProvider::empty(key)
                }
            };
            staged.lock().push(provider);
            barrier.leave();
        });
    }

    /// Runs [`Self::load_all`] and waits for it to finish.
    pub async fn load(&self) {
        let (tx, rx) = oneshot::channel();
        self.load_all(Some(Box::new(move || {
            let _ = tx.send(());
        })));
        if rx.await.is_err() {
            warn!("notification data load dropped before completing");
        }
    }

    /// Cancels a pending request, reloads every section, then runs
    /// `on_complete`. Unknown identifiers are treated as already removed.
    /// Must be called from within a Tokio runtime.
    #[instrument(skip(self, on_complete))]
    pub fn remove_pending(&self, identifier: String, on_complete: Completion) {
        let source = self.clone();
        tokio::spawn(async move {
            source.store.cancel_pending(&[identifier.clone()]).await;
            debug!(%identifier, "pending notification cancelled");
            source.load_all(Some(on_complete));
        });
    }

    /// Removes the request displayed at `row` of `key`. Only the pending
    /// section is editable; other sections and rows past the end are
    /// rejected without touching the store.
    pub fn remove_row(
        &self,
        key: SectionKey,
        row: usize,
        on_complete: Completion,
    ) -> Result<String, SectionError> {
        if !key.is_editable() {
            return Err(SectionError::NotEditable(key));
        }
        let identifier = self
            .registry
            .pending_identifier(row)
            .ok_or(SectionError::RowOutOfBounds { key, row })?;
        self.remove_pending(identifier.clone(), on_complete);
        Ok(identifier)
    }

    pub async fn remove_pending_and_wait(&self, identifier: impl Into<String>) {
        let (tx, rx) = oneshot::channel();
        self.remove_pending(
            identifier.into(),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        if rx.await.is_err() {
            warn!("pending removal dropped before completing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::notifications::{
        AuthorizationOptions, AuthorizationStatus, DeliveredRecord, NotificationCategory,
        NotificationRequest, NotificationSettingsSnapshot, PendingRequestRecord,
    };
    use crate::section::{CellContent, TableSection};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;

    /// Resolves each fetch after a configurable delay; optionally fails or
    /// panics in one.
    struct ScriptedStore {
        settings_delay: u64,
        pending_delay: u64,
        delivered_delay: u64,
        failing: Option<SectionKey>,
        panicking: Option<SectionKey>,
        pending: Mutex<Vec<PendingRequestRecord>>,
        cancelled: Mutex<Vec<String>>,
    }

    impl ScriptedStore {
        fn new(ids: &[&str]) -> Self {
            Self {
                settings_delay: 0,
                pending_delay: 0,
                delivered_delay: 0,
                failing: None,
                panicking: None,
                pending: Mutex::new(
                    ids.iter()
                        .map(|id| PendingRequestRecord {
                            identifier: id.to_string(),
                            title: "New cuddlePix!".into(),
                            next_trigger_date: Utc::now(),
                        })
                        .collect(),
                ),
                cancelled: Mutex::new(Vec::new()),
            }
        }

        fn check(&self, key: SectionKey) -> Result<(), StoreError> {
            if self.panicking == Some(key) {
                panic!("{key:?} fetch blew up");
            }
            if self.failing == Some(key) {
                return Err(StoreError::Unavailable(format!("{key:?} offline")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationStore for ScriptedStore {
        async fn request_authorization(
            &self,
            _options: AuthorizationOptions,
        ) -> Result<bool, StoreError> {
            Ok(true)
        }

        async fn set_categories(&self, _categories: Vec<NotificationCategory>) {}

        async fn submit(&self, _request: NotificationRequest) -> Result<(), StoreError> {
            Ok(())
        }

        async fn settings(&self) -> Result<NotificationSettingsSnapshot, StoreError> {
            tokio::time::sleep(Duration::from_millis(self.settings_delay)).await;
            self.check(SectionKey::Settings)?;
            Ok(NotificationSettingsSnapshot {
                authorization_status: AuthorizationStatus::Authorized,
                ..Default::default()
            })
        }

        async fn pending(&self) -> Result<Vec<PendingRequestRecord>, StoreError> {
            tokio::time::sleep(Duration::from_millis(self.pending_delay)).await;
            self.check(SectionKey::Pending)?;
            Ok(self.pending.lock().clone())
        }

        async fn delivered(&self) -> Result<Vec<DeliveredRecord>, StoreError> {
            tokio::time::sleep(Duration::from_millis(self.delivered_delay)).await;
            self.check(SectionKey::Delivered)?;
            Ok(vec![DeliveredRecord {
                identifier: "hug9".into(),
                title: "New cuddlePix!".into(),
                delivered_at: Utc::now(),
            }])
        }

        async fn cancel_pending(&self, identifiers: &[String]) {
            self.cancelled.lock().extend(identifiers.iter().cloned());
            self.pending
                .lock()
                .retain(|record| !identifiers.contains(&record.identifier));
        }
    }

    #[tokio::test]
    async fn installs_all_sections_regardless_of_resolution_order() {
        let store = Arc::new(ScriptedStore {
            settings_delay: 60,
            pending_delay: 30,
            delivered_delay: 0,
            ..ScriptedStore::new(&["hug1", "hug2"])
        });
        let source = NotificationDataSource::new(store);
        source.load().await;

        let registry = source.registry();
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.ordered_keys(), SectionKey::ALL.to_vec());
        assert_eq!(registry.row_count(SectionKey::Settings), 8);
        assert_eq!(registry.row_count(SectionKey::Pending), 2);
        assert_eq!(registry.row_count(SectionKey::Delivered), 1);
        assert_eq!(
            registry.cell_content(SectionKey::Settings, 0),
            Some(CellContent::Toggle {
                label: "Authorisation Status".into(),
                enabled: true
            })
        );
    }

    #[tokio::test]
    async fn registry_is_untouched_until_every_fetch_reports() {
        let store = Arc::new(ScriptedStore {
            settings_delay: 80,
            ..ScriptedStore::new(&["hug1"])
        });
        let source = NotificationDataSource::new(store);
        let (tx, rx) = oneshot::channel();
        source.load_all(Some(Box::new(move || {
            let _ = tx.send(());
        })));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.registry().count(), 0);
        rx.await.expect("load completion");
        assert_eq!(source.registry().count(), 3);
    }

    #[tokio::test]
    async fn failed_fetch_installs_empty_section() {
        let store = Arc::new(ScriptedStore {
            failing: Some(SectionKey::Pending),
            ..ScriptedStore::new(&["hug1"])
        });
        let source = NotificationDataSource::new(store);
        source.load().await;
        let registry = source.registry();
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.row_count(SectionKey::Pending), 0);
        assert_eq!(
            registry.get(SectionKey::Pending).map(|p| p.name().to_string()),
            Some("Pending Notifications".to_string())
        );
        assert_eq!(registry.row_count(SectionKey::Delivered), 1);
    }

    #[tokio::test]
    async fn panicking_fetch_still_reaches_the_barrier() {
        let store = Arc::new(ScriptedStore {
            panicking: Some(SectionKey::Pending),
            ..ScriptedStore::new(&["hug1"])
        });
        let source = NotificationDataSource::new(store);
        tokio::time::timeout(Duration::from_secs(2), source.load())
            .await
            .expect("load finishes");
        let registry = source.registry();
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.row_count(SectionKey::Pending), 0);
        assert_eq!(registry.row_count(SectionKey::Settings), 8);
        assert_eq!(registry.row_count(SectionKey::Delivered), 1);
    }

    #[tokio::test]
    async fn load_without_callback_broadcasts_change() {
        let source = NotificationDataSource::new(Arc::new(ScriptedStore::new(&[])));
        let mut changes = source.subscribe();
        source.load_all(None);
        let event = tokio::time::timeout(Duration::from_secs(1), changes.recv())
            .await
            .expect("change within timeout")
            .expect("channel open");
        assert_eq!(event, DataChanged);
        assert_eq!(source.registry().count(), 3);
    }

    #[tokio::test]
    async fn overlapping_loads_both_complete() {
        let source = NotificationDataSource::new(Arc::new(ScriptedStore::new(&["hug1"])));
        tokio::join!(source.load(), source.load());
        assert_eq!(source.registry().count(), 3);
        assert_eq!(source.registry().row_count(SectionKey::Pending), 1);
    }

    #[tokio::test]
    async fn removing_unknown_pending_identifier_is_harmless() {
        let store = Arc::new(ScriptedStore::new(&["hug1", "hug2"]));
        let source = NotificationDataSource::new(store.clone());
        source.load().await;
        let before_settings = source.registry().get(SectionKey::Settings);
        let before_delivered = source.registry().snapshot()[2].clone();

        source.remove_pending_and_wait("hug12").await;

        assert_eq!(store.cancelled.lock().as_slice(), ["hug12".to_string()]);
        assert_eq!(source.registry().row_count(SectionKey::Pending), 2);
        assert_eq!(source.registry().get(SectionKey::Settings), before_settings);
        assert_eq!(source.registry().snapshot()[2].rows.len(), before_delivered.rows.len());
    }

    fn noop() -> Completion {
        Box::new(|| {})
    }

    #[tokio::test]
    async fn remove_row_only_accepts_pending_rows() {
        let store = Arc::new(ScriptedStore::new(&["hug1", "hug2"]));
        let source = NotificationDataSource::new(store.clone());
        source.load().await;

        assert_eq!(
            source.remove_row(SectionKey::Delivered, 0, noop()),
            Err(SectionError::NotEditable(SectionKey::Delivered))
        );
        assert_eq!(
            source.remove_row(SectionKey::Pending, 5, noop()),
            Err(SectionError::RowOutOfBounds {
                key: SectionKey::Pending,
                row: 5
            })
        );
        assert!(store.cancelled.lock().is_empty());

        let (tx, rx) = oneshot::channel();
        let removed = source
            .remove_row(
                SectionKey::Pending,
                0,
                Box::new(move || {
                    let _ = tx.send(());
                }),
            )
            .expect("pending row");
        assert_eq!(removed, "hug1");
        rx.await.expect("removal completion");
        assert_eq!(source.registry().row_count(SectionKey::Pending), 1);
        assert_eq!(source.registry().pending_identifier(0).as_deref(), Some("hug2"));
    }
}
