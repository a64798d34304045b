//! Purpose: Shared library crate used by the `slicecfg` CLI, the C ABI, and tests.
//! Exports: `api` (job preparation, schema projection), `core` (typing, coercion, errors).
//! Role: Typed option marshalling engine sitting in front of an opaque compute job.
//! Invariants: Registries are immutable after load; stores are owned by one job.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod abi;
pub mod api;
pub mod core;
mod json;
pub mod notice;
