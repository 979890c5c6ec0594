//! Core abstractions for compcreds: the secure storage contract and test doubles.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod storage;
