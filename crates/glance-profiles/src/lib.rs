pub mod settings_file;
pub mod store;

pub use store::{ProfileStore, StoreError, sanitize_app_name};
