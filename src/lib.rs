/// Image Ingest - base64 image upload service
///
/// Accepts base64 images over HTTP, stores them in object storage under a
/// timestamped key and hands back a public URL.

pub mod api;
pub mod blob_store;
pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod server;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{IngestError, IngestResult};
