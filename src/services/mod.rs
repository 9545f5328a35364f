pub mod auth_service;
pub mod migration_service;
pub mod prompt_service;
pub mod settings_service;
pub mod webhook_service;

pub use migration_service::{MigrationMode, MigrationOutcome};
pub use prompt_service::{PromptRepository, SupabasePromptClient};
pub use webhook_service::WebhookClient;
