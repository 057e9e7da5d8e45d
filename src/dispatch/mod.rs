//! Request validator and dispatcher.
//!
//! Every leaf of the compiled tree is served by the same pipeline: decode
//! the request, run the auth schemes, run the middlewares, validate the
//! bound slots, then invoke the handler once.

pub mod auth;
pub mod dispatcher;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;

pub use auth::{ApiKeyAuth, AuthScheme, BearerAuth, TokenVerifier};
pub use dispatcher::dispatch;
pub use middleware::{Contribution, FnMiddleware, Middleware, from_fn};
pub use request::{Overlay, Principal, RawRequest, RequestView, UploadedFile, Validated};
pub use response::Payload;
