pub mod cli;
pub mod config;
pub mod error;
pub mod normalize;
pub mod ocr;
pub mod receipt;
