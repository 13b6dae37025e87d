//! # cgmdse-error
//!
//! Unified error handling for cgmdse, in the style of OpenDAL's errors.
//!
//! ## Design
//!
//! - **ErrorKind**: what went wrong (e.g. RateLimited, ParseFailed)
//! - **ErrorStatus**: whether trying again could help (Permanent, Temporary)
//! - **Context**: operation name plus key-value pairs for locating the cause
//! - **Source**: the wrapped underlying error, never leaked as a raw type
//!
//! ## Usage
//!
//! ```rust
//! use cgmdse_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::ParseFailed, "no JSON array in reply")
//!         .with_operation("agent::seed")
//!         .with_context("model", "llama-3.3-70b-versatile"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, cgmdse_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - An error is created once; callers further up only append context
//! - `From<OtherError>` is kept to the few cases with an obvious mapping

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the cgmdse Error
pub type Result<T> = std::result::Result<T, Error>;
