//! Message marker traits.
//!
//! Commands, events, and use cases are plain Rust types; these traits tag
//! them for routing and declare what, if anything, comes back.

/// Single-handler request value.
///
/// A command is identified by its concrete type and dispatched to exactly
/// one registered handler. The response type is fixed here, so the command
/// type alone identifies its pipeline.
pub trait Command: Send + 'static {
    /// Value produced by the command's handler.
    type Response: Send + 'static;
}

/// Multi-subscriber notification value with no response.
///
/// Events are distributed as `Arc<E>` so every subscriber observes the same
/// immutable value without copying.
pub trait Event: Send + Sync + 'static {}

/// One-step request dispatched straight to its handler, with no behavior
/// chain in between.
pub trait UseCase: Send + 'static {
    /// Value produced by the use case handler.
    type Output: Send + 'static;
}
