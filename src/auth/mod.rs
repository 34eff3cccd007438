//! Credential lookup.
//!
//! The pipeline never stores tokens itself; it asks a `CredentialProvider`
//! for the current token each time a request is prepared.

pub mod credentials;

pub use credentials::{CredentialProvider, SharedCredentials, StaticCredentials};
