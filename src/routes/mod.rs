/// Router Module Index
///
/// Routes are split by who may call them. Access control sits at the module level
/// (via Axum layers) and, for admin routes, inside the handlers.

/// Routes open to anonymous callers. Some adapt to a caller that happens to be signed in.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// CR verification. The admin role is checked by the verification workflow.
pub mod admin;
