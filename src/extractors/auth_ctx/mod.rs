/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - Hand the authorized request's context (AuthCtx) to handlers
 * - axum-dependent code lives in core, the type itself in types
 *
 * Public API:
 * - AuthCtx
 * - AuthCtxExtractor
 */

mod core;
mod types;

pub use core::AuthCtxExtractor;
pub use types::AuthCtx;
