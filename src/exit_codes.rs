//! Exit code constants for the execstage CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, config, unresolved template, missing working directory)
//! - 2: The command ran and exited non-zero
//! - 3: The command could not be spawned
//! - 4: The command was cancelled

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid config, or a template that does not resolve.
pub const USER_ERROR: i32 = 1;

/// The external command ran and exited with a non-zero status.
pub const COMMAND_FAILURE: i32 = 2;

/// The OS could not create the process (missing executable, permission denied).
pub const SPAWN_FAILURE: i32 = 3;

/// The process was forcibly terminated by a cancel request.
pub const CANCELLED: i32 = 4;
