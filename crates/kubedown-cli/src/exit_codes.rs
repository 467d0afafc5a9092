//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
#[cfg(test)]
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Translation error - manifests cannot be run together (port conflict)
pub const TRANSLATE_ERROR: i32 = 2;

/// Render error - chart could not be templated or credentials are unusable
pub const RENDER_ERROR: i32 = 3;

/// Emit error - one or more units could not be written
pub const EMIT_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or settings (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
