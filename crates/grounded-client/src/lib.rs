//! HTTP client for the grounded messaging API
//!
//! [`HttpMessageClient`] streams generations through
//! [`grounded_stream`] and implements [`grounded_message::MessageService`]
//! against the remote message store.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
pub mod config;
pub mod error;

pub use client::{ByteStream, HttpMessageClient};
pub use config::{ClientConfig, API_URL_ENV, DEFAULT_BASE_URL};
pub use error::ClientError;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for API consumers
    pub use crate::{ClientConfig, ClientError, HttpMessageClient};
    pub use grounded_message::prelude::*;
    pub use grounded_stream::{ProgressObserver, ProgressState};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
