/// Pipeline and step value types
pub mod pipeline;

/// Event and work-item envelopes
pub mod event;

/// Execution records and step results
pub mod execution;

/// Read-only pipeline directory port
pub mod directory;
