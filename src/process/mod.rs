//! Process execution controller.
//!
//! This module provides:
//!
//! - Spawning an argument vector with an explicit environment and working directory
//! - In-memory capture of stdout and stderr
//! - Outcome classification (success, non-zero exit, cancelled, spawn failure)
//! - Cancellation from another thread through a [`CancelHandle`]
//!
//! # State Machine
//!
//! ```text
//! Idle -> Spawning -> Running -> Completed | Killed
//!             \-> SpawnFailed
//! ```
//!
//! A cancel request made while `Spawning` is applied as soon as the process
//! is published; one made while `Idle` or after a terminal phase does nothing.

mod controller;
mod slot;

pub use controller::{CancelHandle, Invocation, ProcessController};
pub use slot::Phase;
