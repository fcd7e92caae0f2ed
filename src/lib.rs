//! Purpose: Shared core library crate used by the `hublens` CLI and tests.
//! Exports: `core` (pool, reference-graph decoder, record extractor, tag
//! filtering, errors) and `notice` (stderr diagnostics schema).
//! Role: Internal library backing the binary; not yet a stable public SDK.
//! Invariants: Core functions are pure and synchronous; all I/O lives in the binary.
pub mod core;
pub mod notice;
