/// File extension of plaintext table exports.
pub const JSONL_EXTENSION: &str = "jsonl";

/// How DBF stores `D` columns.
pub const DBF_DATE_FORMAT: &str = "%Y%m%d";

/// How DBF stores `T` columns.
pub const DBF_DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Indentation of pretty JSON output.
pub const JSON_INDENT: &[u8] = b"    ";

pub const REDACTED: &str = "********";
