//! Request description and payload shaping.
//!
//! # Data Flow
//! ```text
//! caller builds RequestDescriptor + CallOptions
//!     → options.rs (resolve CallOptions against RequestOptions defaults)
//!     → [before-request hook rewrites URL, headers]
//!     → shaper.rs (query/body placement, timestamp, encoding)
//!         → query.rs (bracketed key=value serialization)
//!         → dates.rs (date normalization)
//!         → multipart.rs (file + field parts)
//!     → fingerprint.rs (dedup identity of the shaped descriptor)
//! ```

pub mod dates;
pub mod descriptor;
pub mod fingerprint;
pub mod multipart;
pub mod options;
pub mod query;
pub mod shaper;

pub use descriptor::{Body, ContentType, Method, Params, RequestDescriptor, TIMESTAMP_PARAM, X_REQUEST_ID};
pub use fingerprint::Fingerprint;
pub use multipart::{FileField, MultipartForm, UploadFile, UploadFileParams};
pub use options::{CallOptions, ErrorMessageMode, RequestOptions};
pub use shaper::PayloadShaper;
