use crate::services::dispatcher::{Dispatcher, HttpTransport, Transport};
use crate::services::secrets::SecretCipher;
use crate::services::subscriptions::Subscriptions;
use crate::services::trigger::WebhookService;
use crate::{Config, Database};
use anyhow::Result;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub subscriptions: Subscriptions,
    pub webhooks: Arc<WebhookService>,
}

impl AppState {
    /// Wires the store, dispatcher and worker over the HTTP transport.
    pub fn new(config: Config, db: Database, cipher: Arc<SecretCipher>) -> Result<Self> {
        let hooks = &config.webhooks;
        let transport = HttpTransport::new(
            hooks.timeout(),
            hooks.response_body_limit,
            &hooks.user_agent,
        )?;
        Ok(Self::with_transport(config, db, cipher, Arc::new(transport)))
    }

    pub fn with_transport(
        config: Config,
        db: Database,
        cipher: Arc<SecretCipher>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let hooks = &config.webhooks;
        let subscriptions = Subscriptions::new(db.clone(), cipher, hooks.require_https);
        let dispatcher = Arc::new(Dispatcher::new(
            db.clone(),
            subscriptions.clone(),
            transport,
            hooks.retry.policy(),
            hooks.max_in_flight,
            hooks.response_body_limit,
        ));
        let webhooks = Arc::new(WebhookService::start(dispatcher, hooks.queue_capacity));

        Self {
            config,
            db,
            subscriptions,
            webhooks,
        }
    }
}
