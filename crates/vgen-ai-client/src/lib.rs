//! Clients for the external capabilities used by the generation pipeline.
//!
//! Every client reports failures as [`ExternalServiceError`], whose
//! [`ErrorKind`] tells the caller whether the capability is simply not
//! configured or failed at runtime.

pub mod config;
pub mod error;
pub mod gemini;
pub mod image;
pub mod speech;
pub mod upload;

mod http;

pub use config::{GeminiConfig, ImageConfig, PlatformUploadConfig, PublishConfig, SpeechConfig};
pub use error::{ErrorKind, ExternalServiceError, ServiceResult};
pub use gemini::GeminiScriptClient;
pub use image::ImageClient;
pub use speech::SpeechClient;
pub use upload::{HttpUploader, PlatformUploader, UploadMetadata};
