//! Integration tests for dissatisfied
//!
//! Coordinator, page contexts and the store wired together through the
//! in-memory browser.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod global_mode;
pub mod invalidation;
pub mod persistence;
pub mod tab_mode;
