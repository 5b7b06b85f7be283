//! HTTP job handler.
//!
//! For every job the handler:
//!
//! 1. loads external variables and builds the job's [`courier_overlay::Overlay`]
//! 2. resolves the outbound request, expanding placeholders ([`ResolvedRequest`])
//! 3. sends it with bounded connect and response timeouts
//! 4. classifies the response into a [`JobOutcome`] using the job's status code
//!    patterns and error extraction paths
//!
//! Handler parameters are read from the overlay, case-insensitively:
//!
//! | key | default |
//! |-----|---------|
//! | `url` | required |
//! | `method` | `GET` |
//! | `body` (exact key, any JSON value) | none |
//! | `authorization` | none |
//! | `contentType`, `accept` | `application/json` |
//! | `statusCodeCompletion` | `1xx,2xx` |
//! | `statusCodeFailure` | `3xx,4xx,5xx` |
//! | `errorCodePath`, `errorMessagePath` | none |

mod error;
mod extract;
mod handler;
mod outcome;
mod request;
mod status;

pub use error::HandlerError;
pub use handler::{HttpJobHandler, HttpResponse, classify};
pub use outcome::JobOutcome;
pub use request::ResolvedRequest;
pub use status::{DEFAULT_COMPLETION_PATTERN, DEFAULT_FAILURE_PATTERN, StatusCodePattern};
