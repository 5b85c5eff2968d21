//! Auth module: three-layer architecture (domain, repository, service).
//!
//! `AuthService` is the in-process mock backend; `HttpAuthBackend` talks to
//! the same backend over HTTP. Both implement [`backend::AuthBackend`], the
//! only interface the session store depends on.

pub mod backend;
pub mod domain;
pub mod errors;
pub mod http;
pub mod repository;
pub mod service;
pub mod repo;

pub use backend::{signup, AuthBackend};
pub use errors::AuthError;
pub use http::HttpAuthBackend;
pub use service::AuthService;
