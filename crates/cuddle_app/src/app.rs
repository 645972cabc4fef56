use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use cuddle_core::notifications::{AuthorizationOptions, NotificationCategory, NotificationStore};
use cuddle_core::{
    BatchScheduler, CellContent, CuddleConfig, DataChanged, MemoryNotificationStore,
    NotificationDataSource, SectionKey,
};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

/// Result of the configuration screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationOutcome {
    pub new_notifications: bool,
}

/// How a notification arriving in the foreground is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationOptions {
    Alert,
}

/// Composes the scheduler and the section data the way the list and
/// configuration screens use them.
pub struct CuddleController {
    config: CuddleConfig,
    store: Arc<dyn NotificationStore>,
    scheduler: BatchScheduler,
    data: NotificationDataSource,
}

impl CuddleController {
    pub fn new(config: CuddleConfig, store: Arc<dyn NotificationStore>) -> Self {
        let scheduler = BatchScheduler::new(store.clone(), config.clone());
        Self::with_scheduler(config, store, scheduler)
    }

    pub fn with_scheduler(
        config: CuddleConfig,
        store: Arc<dyn NotificationStore>,
        scheduler: BatchScheduler,
    ) -> Self {
        info!(
            batch_count = config.batch_count,
            image_pool = config.image_pool_size,
            "initializing controller"
        );
        let data = NotificationDataSource::new(store.clone());
        Self {
            config,
            store,
            scheduler,
            data,
        }
    }

    pub fn config(&self) -> &CuddleConfig {
        &self.config
    }

    pub fn data(&self) -> &NotificationDataSource {
        &self.data
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataChanged> {
        self.data.subscribe()
    }

    /// Registers the notification category carrying the star action.
    pub async fn launch(&self) {
        self.store
            .set_categories(vec![NotificationCategory::cuddle_pix()])
            .await;
        debug!("notification categories registered");
    }

    /// Asks for permission and loads the list when granted.
    pub async fn start(&self) -> Result<bool> {
        let granted = self
            .store
            .request_authorization(AuthorizationOptions::default())
            .await
            .context("notification authorization request failed")?;
        if granted {
            self.reload_and_notify().await;
        } else {
            warn!("notification permission declined");
        }
        Ok(granted)
    }

    /// Schedules the batch picked on the configuration screen. An
    /// unparseable selection schedules nothing.
    pub async fn handle_schedule(&self, selection: Option<&str>) -> ConfigurationOutcome {
        let Some(count) = selection.and_then(|s| s.trim().parse::<usize>().ok()) else {
            debug!(?selection, "no batch size selected");
            return self.configuration_completed(false).await;
        };
        let start = Instant::now();
        let report = self.scheduler.run_batch(count).await;
        info!(
            requested = report.requested,
            failed = report.failed,
            elapsed_ms = %start.elapsed().as_millis(),
            "batch scheduled"
        );
        self.configuration_completed(count > 0).await
    }

    pub async fn handle_cuddle_me_now(&self) -> ConfigurationOutcome {
        let report = self.scheduler.run_one(self.config.now_delay_secs).await;
        if report.failed > 0 {
            warn!("immediate cuddle could not be scheduled");
        }
        self.configuration_completed(true).await
    }

    async fn configuration_completed(&self, new_notifications: bool) -> ConfigurationOutcome {
        if new_notifications {
            self.reload_and_notify().await;
        }
        ConfigurationOutcome { new_notifications }
    }

    /// Pull-to-refresh: reloads every section and waits for it.
    pub async fn refresh(&self) {
        let start = Instant::now();
        self.data.load().await;
        info!(elapsed_ms = %start.elapsed().as_millis(), "refresh completed");
    }

    async fn reload_and_notify(&self) {
        self.data.load().await;
        self.data.notify_changed();
    }

    /// Deletes the pending request shown at `row` of table section
    /// `section_index`, returning its identifier once the list is reloaded.
    pub async fn delete_row(&self, section_index: usize, row: usize) -> Result<String> {
        let key = self
            .data
            .registry()
            .key_at(section_index)
            .ok_or_else(|| anyhow!("no section at index {section_index}"))?;
        let (tx, rx) = oneshot::channel();
        let identifier = self
            .data
            .remove_row(
                key,
                row,
                Box::new(move || {
                    let _ = tx.send(());
                }),
            )
            .with_context(|| format!("unable to delete row {row}"))?;
        rx.await.context("reload after deletion was dropped")?;
        info!(%identifier, "pending notification removed");
        Ok(identifier)
    }

    /// A notification arrived while the app is in the foreground. Reloads
    /// every section in the background; [`DataChanged`] follows the install.
    pub fn will_present(&self) -> PresentationOptions {
        self.data.load_all(None);
        PresentationOptions::Alert
    }

    /// The user responded to a notification.
    pub fn did_receive(&self, action_identifier: &str) {
        info!(action = action_identifier, "received notification response");
        self.data.load_all(None);
    }

    /// Section-ordered text rendering of the list.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for view in self.data.registry().snapshot() {
            let _ = writeln!(out, "== {} ==", view.name);
            if view.rows.is_empty() {
                let _ = writeln!(out, "  (none)");
            }
            for row in &view.rows {
                match row {
                    CellContent::Toggle { label, enabled } => {
                        let mark = if *enabled { "✓" } else { " " };
                        let _ = writeln!(out, "  [{mark}] {label}");
                    }
                    CellContent::Detail { title, detail } => {
                        let _ = writeln!(out, "  {title} ({detail})");
                    }
                }
            }
        }
        out
    }

    pub fn render_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.data.registry().snapshot())
            .context("failed to serialize sections")
    }

    pub fn pending_count(&self) -> usize {
        self.data.registry().row_count(SectionKey::Pending)
    }
}

/// Runs a demo session against the in-memory store: schedules the
/// configured batch plus an immediate cuddle, delivers what is due and
/// prints the resulting sections.
pub fn run(config: CuddleConfig, json: bool) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(async move {
        let store = Arc::new(MemoryNotificationStore::new(config.image_pool_size));
        let controller = CuddleController::new(config.clone(), store.clone());
        controller.launch().await;
        if !controller.start().await? {
            println!("Notifications are disabled; nothing to schedule.");
            return Ok(());
        }

        let selection = config.batch_count.to_string();
        controller.handle_schedule(Some(&selection)).await;
        controller.handle_cuddle_me_now().await;

        let horizon = chrono::Duration::milliseconds((config.now_delay_secs * 1000.0) as i64);
        store.deliver_due(chrono::Utc::now() + horizon);
        let mut changes = controller.subscribe();
        if controller.will_present() == PresentationOptions::Alert {
            changes
                .recv()
                .await
                .context("section reload after delivery was dropped")?;
        }

        if json {
            println!("{}", controller.render_json()?);
        } else {
            print!("{}", controller.render());
        }
        anyhow::Ok(())
    })
}
