//! REST API module.
//!
//! Handlers return plain JSON bodies, as the admin panel and content pages expect.

mod content;

pub use content::*;

/// Handler result; errors render as `{ "error", "code" }` JSON bodies.
pub type ApiResult<T> = Result<T, crate::errors::AppError>;
