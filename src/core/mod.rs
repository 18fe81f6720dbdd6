//! Core business logic - framework-agnostic scheduler, audit and statistics operations.

/// Manual assignment status changes
pub mod assignment;
/// Audit log writes and paginated history
pub mod audit;
/// The auto-close engine
pub mod auto_close;
/// Auto-close statistics
pub mod stats;
/// Scheduler status store
pub mod status;
/// Manual and automatic run triggers
pub mod trigger;
