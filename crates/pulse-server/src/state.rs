use anyhow::Context;
use pulse_core::config::Config;
use pulse_core::db::PulseDb;
use pulse_llm::{HttpGenerator, TextGenerator};
use std::sync::Arc;

use crate::billing::{portal_from_config, BillingPortal};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<PulseDb>,
    pub config: Arc<Config>,
    pub generator: Arc<dyn TextGenerator>,
    pub billing: Arc<dyn BillingPortal>,
}

impl AppState {
    pub fn new(
        db: PulseDb,
        config: Config,
        generator: Arc<dyn TextGenerator>,
        billing: Arc<dyn BillingPortal>,
    ) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            generator,
            billing,
        }
    }

    /// Wire the real collaborators named by `config`.
    pub fn from_config(db: PulseDb, config: Config) -> anyhow::Result<Self> {
        let generation = &config.generation;
        let generator = HttpGenerator::from_env(
            &generation.base_url,
            &generation.model,
            &generation.api_key_env,
        )
        .context("configuring text generation")?;
        let billing = portal_from_config(&config.billing).context("configuring billing")?;
        tracing::debug!(model = generator.model(), billing = ?config.billing.provider, "collaborators ready");
        Ok(Self::new(db, config, Arc::new(generator), billing))
    }
}
