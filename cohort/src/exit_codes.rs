//! Stable exit codes for `cohort` CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input, parameters, layout or any other error.
pub const INVALID: i32 = 1;
/// Input file resolution left at least one image without a match.
pub const MISSING_FILES: i32 = 2;
