/// Image ingest pipeline
///
/// Accepts base64 image uploads, validates and decodes them, and stores
/// them in the blob backend under a timestamped key.

pub mod models;
pub mod payload;
pub mod service;

pub use models::*;
pub use service::{Clock, IngestService, SystemClock};
