pub mod chat;
pub mod identity;
pub mod prompt;
pub mod universal_overrides;
pub mod user_settings;

pub use chat::*;
pub use identity::*;
pub use prompt::*;
pub use universal_overrides::*;
pub use user_settings::*;
