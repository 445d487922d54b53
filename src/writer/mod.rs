pub mod batch;
pub mod applier;
