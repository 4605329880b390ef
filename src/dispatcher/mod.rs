//! Update dispatching.
//!
//! Runs the long-poll loop and turns each inbound message into a reply.

#[allow(clippy::module_inception)]
mod dispatcher;

pub use dispatcher::Dispatcher;
