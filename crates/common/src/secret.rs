//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate with Roomcast-specific
//! guidance. Use these types for all sensitive values such as connection URLs
//! that embed credentials, API keys, and tokens.
//!
//! # Compile-Time Safety
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so any
//! struct that derives `Debug` while holding a secret automatically gets safe
//! logging behavior. Accidentally logging a secret via `{:?}` or tracing is
//! therefore impossible.
//!
//! # Memory Safety
//!
//! Secrets are zeroized when dropped, so sensitive data does not linger in
//! memory after use.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct StoreConfig {
//!     namespace: String,
//!     redis_url: SecretString,  // Safe: Debug shows "[REDACTED]"
//! }
//!
//! let cfg = StoreConfig {
//!     namespace: "rooms".to_string(),
//!     redis_url: SecretString::from("redis://:hunter2@localhost:6379"),
//! };
//!
//! // Safe - the URL (and the password inside it) is redacted
//! println!("{:?}", cfg);
//!
//! // Accessing the actual value requires an explicit expose_secret() call
//! let url: &str = cfg.redis_url.expose_secret();
//! ```
//!
//! # Roomcast Usage Guidelines
//!
//! Use `SecretString` for:
//! - Connection URLs that may embed passwords (`redis://:pw@host`)
//! - API keys and bearer tokens
//!
//! Use `SecretBox<T>` for custom secret types (e.g. `SecretBox<[u8]>` for
//! binary key material).

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};
