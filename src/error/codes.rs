/// Error code registry for Stagehand
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 3000-3999: Storage errors
/// - 5000-5999: Resolution errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_INVALID_JSON: u16 = 1003;
    pub const CONFIG_DUPLICATE_ENV_KEY: u16 = 1010;
    pub const CONFIG_DUPLICATE_STEP_NAME: u16 = 1011;

    // Storage errors (3000-3999)
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PERMISSION_DENIED: u16 = 3002;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_ALREADY_EXISTS: u16 = 3005;

    // Resolution errors (5000-5999)
    pub const RESOLVE_UNRESOLVABLE_NAME: u16 = 5011;
    pub const RESOLVE_INCOMPLETE_KEY_PATH: u16 = 5012;
    pub const RESOLVE_EXTRA_KEY_SEGMENTS: u16 = 5013;
    pub const RESOLVE_KEY_NOT_FOUND: u16 = 5014;
    pub const RESOLVE_INVALID_INDEX: u16 = 5015;
    pub const RESOLVE_INVALID_PREVIOUS: u16 = 5016;
    pub const RESOLVE_INVALID_TMP: u16 = 5017;
    pub const RESOLVE_TEMP_ALLOCATION: u16 = 5018;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Configuration errors
        1000 => "Generic configuration error",
        1001 => "Manifest file not found",
        1002 => "Invalid YAML syntax in manifest",
        1003 => "Invalid JSON syntax in manifest",
        1010 => "Two environment variables normalize to the same name",
        1011 => "Two steps share the same name",

        // Storage errors
        3001 => "Storage I/O error",
        3002 => "Storage permission denied",
        3004 => "Storage item not found",
        3005 => "Storage item already exists",

        // Resolution errors
        5011 => "Placeholder names nothing that is in scope",
        5012 => "Placeholder key path ends on a record or list",
        5013 => "Placeholder key path continues past a value",
        5014 => "Placeholder key path names a missing key",
        5015 => "Placeholder key path uses an invalid list index",
        5016 => "'previous' used before any step completed",
        5017 => "'tmp' must be followed by 'dir' or 'file'",
        5018 => "Failed to allocate a temporary resource",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_ranges() {
        assert!(ErrorCode::CONFIG_GENERIC < 2000);
        assert!((3000..4000).contains(&ErrorCode::STORAGE_IO_ERROR));
        assert!((5000..6000).contains(&ErrorCode::RESOLVE_TEMP_ALLOCATION));
    }

    #[test]
    fn test_describe_error_code() {
        assert_eq!(
            describe_error_code(ErrorCode::RESOLVE_INVALID_PREVIOUS),
            "'previous' used before any step completed"
        );
        assert_eq!(describe_error_code(4242), "Unknown error code");
    }
}
