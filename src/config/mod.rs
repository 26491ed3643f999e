//! Configuration types and loading for liftassist

mod integrations;
mod loader;
mod matcher;

pub use integrations::IntegrationsConfig;
pub use loader::AssistConfig;
pub use matcher::MatcherConfig;
