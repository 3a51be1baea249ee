//! Reconcile a Modrinth collection against a local packwiz modpack.
//!
//! A run fetches the collection's ordered project ids, resolves each id to a
//! slug, classifies it against the mods already present on disk, and installs
//! what is missing through packwiz. Runs are idempotent: re-running after a
//! partial failure only installs what is still missing.
//!
//! - **[`core`]**: Pure, deterministic logic (types, planning, summaries).
//! - **[`io`]**: Side-effecting collaborators (config, Modrinth API, mods
//!   directory, subprocesses). Isolated behind traits so tests can script them.
//!
//! Orchestration modules ([`resolve`], [`execute`], [`sync`], [`report`])
//! join core logic with I/O to implement the CLI commands.

pub mod cancel;
pub mod core;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
pub mod resolve;
pub mod sync;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
