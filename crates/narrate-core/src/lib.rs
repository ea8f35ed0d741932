//! Types shared across the narrate crates

mod error;

pub use error::HttpError;
