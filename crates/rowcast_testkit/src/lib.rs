//! # rowcast testkit
//!
//! Test utilities for rowcast.
//!
//! This crate provides:
//! - The "Customers" fixture: a 19-column catalog, rows and selections
//! - Property-based test generators using proptest
//! - Concurrent serialization stress helpers
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowcast_testkit::prelude::*;
//!
//! #[test]
//! fn serializes_customers() {
//!     init_tracing();
//!     let serializer = customers_serializer(SerializerConfig::default());
//!     // ... serializer calls
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::stress::*;
    pub use rowcast_core::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;

/// Installs a test-friendly tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `debug`. Safe to call
/// from every test; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
