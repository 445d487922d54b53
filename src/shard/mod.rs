pub mod actor;
pub mod handle;
pub mod router;
