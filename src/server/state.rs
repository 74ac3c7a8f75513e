use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::auth::{CredentialHasher, TokenService};
use crate::config::Settings;
use crate::notification::{NotificationDispatcher, NotificationJob, Notifier, PushGateway};
use crate::store::{DocumentStore, Store};
use crate::triggers::WriteTriggers;
use crate::uploads::ImageStore;
use crate::ward::WardMatcher;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Store,
    pub tokens: Arc<TokenService>,
    pub passwords: Arc<CredentialHasher>,
    pub ward_matcher: Arc<WardMatcher>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub triggers: Arc<WriteTriggers>,
    pub images: Arc<ImageStore>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the collaborators together.
    ///
    /// In background notification mode the outbox receiver is returned; the
    /// caller runs a `NotificationWorker` on it.
    pub fn new(
        settings: Settings,
        backend: Arc<dyn DocumentStore>,
        gateway: Arc<dyn PushGateway>,
        images: ImageStore,
    ) -> (Self, Option<mpsc::Receiver<NotificationJob>>) {
        let store = Store::new(backend);
        let tokens = Arc::new(TokenService::new(&settings.jwt));
        let ward_matcher = Arc::new(WardMatcher::new(store.clone()));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            gateway,
            Duration::from_secs(settings.push.batch_timeout_seconds),
        ));

        let (notifier, outbox) = if settings.notifications.is_inline() {
            (Notifier::inline(dispatcher.clone()), None)
        } else {
            let (notifier, rx) =
                Notifier::background(dispatcher.clone(), settings.notifications.outbox_capacity);
            (notifier, Some(rx))
        };

        let triggers = Arc::new(WriteTriggers::new(ward_matcher.clone(), notifier));

        let state = Self {
            settings: Arc::new(settings),
            store,
            tokens,
            passwords: Arc::new(CredentialHasher::new()),
            ward_matcher,
            dispatcher,
            triggers,
            images: Arc::new(images),
            start_time: Instant::now(),
        };

        (state, outbox)
    }
}
