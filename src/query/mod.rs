pub mod context;
pub mod parser;
