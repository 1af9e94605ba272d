//! Standard exit codes (BSD sysexits.h compatible)

/// Command line usage error (bad arguments, invalid pattern)
pub const USAGE: i32 = 64;

/// Data format error (no capture could be decoded)
pub const DATAERR: i32 = 65;

/// Cannot open input (no captures, unknown package or tree)
pub const NOINPUT: i32 = 66;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
