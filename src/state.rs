use std::sync::Arc;
use std::time::Duration;

use crate::{
    models::{SessionIdentity, SupabaseConfig},
    seeds::RuleSet,
    services::{
        prompt_service::PromptError, MigrationMode, PromptRepository, SupabasePromptClient,
        WebhookClient,
    },
    storage::SettingsStore,
};

/// Builds a prompts client for a resolved database config.
pub type PromptRepositoryFactory =
    Arc<dyn Fn(&SupabaseConfig) -> Result<Box<dyn PromptRepository>, PromptError> + Send + Sync>;

/// Estado compartilhado entre os workers do actix
#[derive(Clone)]
pub struct AppState {
    pub store: SettingsStore,
    pub rules: Arc<RuleSet>,
    pub webhook: WebhookClient,
    pub migration_mode: MigrationMode,
    pub prompts: PromptRepositoryFactory,
}

impl AppState {
    pub fn new(
        store: SettingsStore,
        rules: RuleSet,
        webhook: WebhookClient,
        migration_mode: MigrationMode,
        supabase_timeout: Duration,
    ) -> Self {
        Self {
            store,
            rules: Arc::new(rules),
            webhook,
            migration_mode,
            prompts: Arc::new(move |config: &SupabaseConfig| {
                SupabasePromptClient::new(config, supabase_timeout)
                    .map(|client| Box::new(client) as Box<dyn PromptRepository>)
            }),
        }
    }

    /// Prompts client configured with the caller's resolved database config
    pub fn prompt_repository(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Box<dyn PromptRepository>, PromptError> {
        let config = crate::services::settings_service::get_user_supabase_config(
            &self.store,
            &self.rules,
            identity,
        );
        (self.prompts)(&config)
    }
}
