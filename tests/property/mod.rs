//! Property-based tests for name derivation, flag rules, and metadata upserts

mod flags;
mod names;
