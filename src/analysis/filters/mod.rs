pub mod lowercase;
pub mod ascii_folding;
pub mod length;
