//! Stable exit codes for packsync CLI commands.

/// Run completed. Per-entry failures are reported, not fatal.
pub const OK: i32 = 0;
/// Precondition failure (missing pack manifest or installer) or another
/// fatal error such as invalid config or an unreachable collection.
pub const FAILED: i32 = 1;
