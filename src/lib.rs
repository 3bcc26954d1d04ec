pub mod annotate;
pub mod cache;
pub mod config;
pub mod decoder;
pub mod error;
pub mod ner;
pub mod server;
pub mod service;
pub mod source;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod validate;

pub use error::CaptionError;
