//! Internal implementation details.

pub(crate) mod shutdown_stack;

pub(crate) use shutdown_stack::ShutdownStack;
