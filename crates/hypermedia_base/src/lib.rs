/* 📖 # The base crate

hypermedia_base holds what every other crate in the workspace needs: the error type, the
tracing setup and the HTTP response envelope the visitor pipeline produces.
*/

pub mod error;
pub mod http;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, HypermediaError, HypermediaResult, ResultExt};
pub use http::{HttpBody, HttpHeaders, HttpResponse, HttpStatusCode};
