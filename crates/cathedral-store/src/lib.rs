pub mod error;
pub mod home;
pub mod schema;
pub mod source;
pub mod store;

pub use error::{Result, StoreError};
pub use home::{SettingsHome, default_base_dir, sanitize_name};
pub use source::DirSource;
pub use store::Store;
