//! Purpose: Library crate behind the `markergeom` CLI and integration tests.
//! Exports: `api` (stable surface), `core` (tokenizer, cursor, loader, errors), `notice`.
//! Role: Loads marker calibration JSON into flat, transposed integer arrays.
//! Invariants: Loads are synchronous and own every buffer they allocate.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod notice;
