pub mod layout;
pub mod snapshot;
pub mod store;
pub mod file_lock;
