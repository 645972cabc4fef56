use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::barrier::CompletionBarrier;
use crate::config::CuddleConfig;
use crate::notifications::{
    Attachment, NotificationContent, NotificationRequest, NotificationStore,
    TimeIntervalTrigger, NEW_CUDDLE_PIX_CATEGORY,
};
use crate::random;

/// How request identifiers are derived from the chosen image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierPolicy {
    /// The image name itself. Two requests picking the same image share an
    /// identifier and the later one replaces the earlier in the store.
    #[default]
    ImageName,
    /// Image name plus a random UUID; never collides.
    Unique,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub requested: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.requested - self.failed
    }
}

/// Builds randomized cuddle notifications and hands them to the store.
///
/// Submissions run concurrently on the current tokio runtime; the completion
/// runs once after every submission has reported. Failed submissions are
/// logged and still count as reported.
pub struct BatchScheduler {
    store: Arc<dyn NotificationStore>,
    config: CuddleConfig,
    rng: Mutex<StdRng>,
}

impl BatchScheduler {
    pub fn new(store: Arc<dyn NotificationStore>, config: CuddleConfig) -> Self {
        Self::with_rng(store, config, StdRng::from_entropy())
    }

    pub fn with_rng(store: Arc<dyn NotificationStore>, config: CuddleConfig, rng: StdRng) -> Self {
        Self {
            store,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &CuddleConfig {
        &self.config
    }

    /// A request firing after `delay_secs` with a randomly chosen image.
    pub fn build_request(&self, delay_secs: f64) -> NotificationRequest {
        let image = random::random_image_name(&mut *self.rng.lock(), self.config.image_pool_size);
        self.request_for(image, delay_secs)
    }

    fn random_requests(&self, count: usize) -> Vec<NotificationRequest> {
        let picks: Vec<(String, f64)> = {
            let mut rng = self.rng.lock();
            (0..count)
                .map(|_| {
                    let delay = random::random_delay(&mut *rng, self.config.max_delay_secs);
                    let image = random::random_image_name(&mut *rng, self.config.image_pool_size);
                    (image, delay)
                })
                .collect()
        };
        picks
            .into_iter()
            .map(|(image, delay)| self.request_for(image, delay))
            .collect()
    }

    fn request_for(&self, image: String, delay_secs: f64) -> NotificationRequest {
        let identifier = match self.config.identifier_policy {
            IdentifierPolicy::ImageName => image.clone(),
            IdentifierPolicy::Unique => format!("{image}-{}", Uuid::new_v4()),
        };
        NotificationRequest {
            identifier,
            content: NotificationContent {
                title: "New cuddlePix!".to_string(),
                subtitle: "What a treat".to_string(),
                body: "Cheer yourself up with a hug 🤗".to_string(),
                attachments: vec![Attachment {
                    url: self.config.image_url(&image),
                    identifier: image,
                }],
                category_identifier: NEW_CUDDLE_PIX_CATEGORY.to_string(),
            },
            trigger: TimeIntervalTrigger::once(delay_secs),
        }
    }

    /// Schedules `count` random notifications. Must be called from within a
    /// tokio runtime when `count > 0`.
    #[instrument(skip(self, on_complete))]
    pub fn schedule_batch(&self, count: usize, on_complete: impl FnOnce() + Send + 'static) {
        if count == 0 {
            debug!("empty batch requested");
            on_complete();
            return;
        }
        let requests = self.random_requests(count);
        self.dispatch(requests, move |_| on_complete());
    }

    /// Schedules a single notification after a fixed delay.
    #[instrument(skip(self, on_complete))]
    pub fn schedule_one(&self, delay_secs: f64, on_complete: impl FnOnce() + Send + 'static) {
        let request = self.build_request(delay_secs);
        self.dispatch(vec![request], move |_| on_complete());
    }

    pub async fn run_batch(&self, count: usize) -> BatchReport {
        if count == 0 {
            return BatchReport::default();
        }
        let requests = self.random_requests(count);
        self.dispatch_and_wait(requests).await
    }

    pub async fn run_one(&self, delay_secs: f64) -> BatchReport {
        let request = self.build_request(delay_secs);
        self.dispatch_and_wait(vec![request]).await
    }

    async fn dispatch_and_wait(&self, requests: Vec<NotificationRequest>) -> BatchReport {
        let requested = requests.len();
        let (tx, rx) = oneshot::channel();
        self.dispatch(requests, move |report| {
            let _ = tx.send(report);
        });
        rx.await.unwrap_or(BatchReport {
            requested,
            failed: requested,
        })
    }

    fn dispatch(
        &self,
        requests: Vec<NotificationRequest>,
        on_complete: impl FnOnce(BatchReport) + Send + 'static,
    ) {
        let requested = requests.len();
        let failed = Arc::new(AtomicUsize::new(0));
        let barrier = {
            let failed = failed.clone();
            CompletionBarrier::new(requested, move || {
                let report = BatchReport {
                    requested,
                    failed: failed.load(Ordering::Acquire),
                };
                info!(requested, failed = report.failed, "batch registered");
                on_complete(report);
            })
        };

        for request in requests {
            let store = self.store.clone();
            let barrier = barrier.clone();
            let failed = failed.clone();
            tokio::spawn(async move {
                let identifier = request.identifier.clone();
                let delay_secs = request.trigger.interval_secs;
                match store.submit(request).await {
                    Ok(()) => debug!(%identifier, delay_secs, "notification scheduled"),
                    Err(err) => {
                        failed.fetch_add(1, Ordering::AcqRel);
                        warn!(%identifier, %err, "failed to schedule notification");
                    }
                }
                barrier.leave();
            });
        }
    }
}
