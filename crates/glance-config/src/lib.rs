pub mod overrides;
pub mod settings;

pub use overrides::SettingsOverrides;
pub use settings::{OcrSettings, SettingsError};
