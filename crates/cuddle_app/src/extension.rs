//! Behaviour of the expanded notification view: which image to show and how
//! to answer the category actions.

use std::time::Duration;

use cuddle_core::notifications::{Attachment, NotificationRequest, STAR_ACTION};
use tracing::debug;

/// Time the stars stay on screen before the view is dismissed.
pub const DISMISS_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOption {
    DismissAndForwardAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionResponse {
    pub show_stars: bool,
    pub dismiss_after: Duration,
    pub option: ResponseOption,
}

/// The image displayed for a delivered request.
pub fn attachment_for(request: &NotificationRequest) -> Option<&Attachment> {
    request.content.attachments.first()
}

pub fn respond(action_identifier: &str) -> ExtensionResponse {
    let show_stars = action_identifier == STAR_ACTION;
    debug!(action = action_identifier, show_stars, "notification action");
    ExtensionResponse {
        show_stars,
        dismiss_after: DISMISS_DELAY,
        option: ResponseOption::DismissAndForwardAction,
    }
}

/// Waits out the response's delay, then hands its option to `complete`.
pub async fn complete_after(response: ExtensionResponse, complete: impl FnOnce(ResponseOption)) {
    tokio::time::sleep(response.dismiss_after).await;
    complete(response.option);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuddle_core::notifications::{
        NotificationContent, TimeIntervalTrigger, DISMISS_ACTION, NEW_CUDDLE_PIX_CATEGORY,
    };
    use std::sync::{Arc, Mutex};

    #[test]
    fn star_action_shows_stars() {
        let response = respond(STAR_ACTION);
        assert!(response.show_stars);
        assert_eq!(response.option, ResponseOption::DismissAndForwardAction);

        let response = respond(DISMISS_ACTION);
        assert!(!response.show_stars);
        assert_eq!(response.dismiss_after, DISMISS_DELAY);
    }

    #[test]
    fn first_attachment_is_displayed() {
        let request = NotificationRequest {
            identifier: "hug2".into(),
            content: NotificationContent {
                title: "New cuddlePix!".into(),
                subtitle: "What a treat".into(),
                body: "hug".into(),
                attachments: vec![Attachment {
                    identifier: "hug2".into(),
                    url: "assets/hug2.jpg".into(),
                }],
                category_identifier: NEW_CUDDLE_PIX_CATEGORY.into(),
            },
            trigger: TimeIntervalTrigger::once(5.0),
        };
        assert_eq!(
            attachment_for(&request).map(|a| a.url.as_str()),
            Some("assets/hug2.jpg")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn completion_waits_for_dismiss_delay() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let started = tokio::time::Instant::now();
        complete_after(respond(STAR_ACTION), move |option| {
            *sink.lock().unwrap() = Some(option);
        })
        .await;
        assert!(started.elapsed() >= DISMISS_DELAY);
        assert_eq!(
            *seen.lock().unwrap(),
            Some(ResponseOption::DismissAndForwardAction)
        );
    }
}
