/// Error code registry for pipeflow
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Definition resolution errors
/// - 3000-3999: Parameter binding errors
/// - 4000-4999: Dispatch errors (local runtime and strategy selection)
/// - 5000-5999: Remote worker errors
/// - 6000-6999: Cluster errors
/// - 7000-7999: Log artifact errors
/// - 9000-9999: Other errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_INVALID_JSON: u16 = 1003;
    pub const CONFIG_INVALID_TOML: u16 = 1004;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_UNSUPPORTED_FORMAT: u16 = 1006;

    // Resolution errors (2000-2999)
    pub const RESOLUTION_GENERIC: u16 = 2000;
    pub const RESOLUTION_NOT_FOUND: u16 = 2001;
    pub const RESOLUTION_STORE_UNAVAILABLE: u16 = 2002;
    pub const RESOLUTION_INVALID_DEFINITION: u16 = 2003;
    pub const RESOLUTION_EMPTY_REFERENCE: u16 = 2004;

    // Binding errors (3000-3999)
    pub const BINDING_GENERIC: u16 = 3000;
    pub const BINDING_UNKNOWN_PARAMETER: u16 = 3001;

    // Dispatch errors (4000-4999)
    pub const DISPATCH_GENERIC: u16 = 4000;
    pub const DISPATCH_RUNTIME_START: u16 = 4001;
    pub const DISPATCH_RUNTIME_FAILED: u16 = 4002;
    pub const DISPATCH_UNKNOWN_WORKER: u16 = 4003;
    pub const DISPATCH_HOOK_FAILED: u16 = 4004;
    pub const DISPATCH_CANCELLED: u16 = 4005;

    // Remote errors (5000-5999)
    pub const REMOTE_GENERIC: u16 = 5000;
    pub const REMOTE_SUBMIT_FAILED: u16 = 5001;
    pub const REMOTE_UNREACHABLE: u16 = 5002;
    pub const REMOTE_REJECTED: u16 = 5003;
    pub const REMOTE_UNTRUSTED: u16 = 5004;
    pub const REMOTE_PROTOCOL: u16 = 5005;

    // Cluster errors (6000-6999)
    pub const CLUSTER_GENERIC: u16 = 6000;
    pub const CLUSTER_NO_TOPOLOGY: u16 = 6001;
    pub const CLUSTER_SPLIT_FAILED: u16 = 6002;
    pub const CLUSTER_START_FAILED: u16 = 6003;
    pub const CLUSTER_MONITOR_FAILED: u16 = 6004;

    // Log artifact errors (7000-7999)
    pub const LOG_GENERIC: u16 = 7000;
    pub const LOG_MISSING_NAME: u16 = 7001;
    pub const LOG_PARENT_MISSING: u16 = 7002;
    pub const LOG_OPEN_FAILED: u16 = 7003;
    pub const LOG_WRITE_FAILED: u16 = 7004;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_IO: u16 = 9001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONFIG_GENERIC => "Configuration error",
        ErrorCode::CONFIG_NOT_FOUND => "Configuration file not found",
        ErrorCode::CONFIG_INVALID_YAML => "Invalid YAML syntax",
        ErrorCode::CONFIG_INVALID_JSON => "Invalid JSON syntax",
        ErrorCode::CONFIG_INVALID_TOML => "Invalid TOML syntax",
        ErrorCode::CONFIG_INVALID_VALUE => "Invalid configuration value",
        ErrorCode::CONFIG_UNSUPPORTED_FORMAT => "Unsupported configuration file format",

        ErrorCode::RESOLUTION_GENERIC => "Pipeline definition could not be resolved",
        ErrorCode::RESOLUTION_NOT_FOUND => "Pipeline definition not found",
        ErrorCode::RESOLUTION_STORE_UNAVAILABLE => "Definition store unavailable",
        ErrorCode::RESOLUTION_INVALID_DEFINITION => "Pipeline definition is invalid",
        ErrorCode::RESOLUTION_EMPTY_REFERENCE => "Pipeline reference is empty",

        ErrorCode::BINDING_GENERIC => "Parameter binding error",
        ErrorCode::BINDING_UNKNOWN_PARAMETER => "Unknown named parameter",

        ErrorCode::DISPATCH_GENERIC => "Dispatch error",
        ErrorCode::DISPATCH_RUNTIME_START => "Pipeline could not be started",
        ErrorCode::DISPATCH_RUNTIME_FAILED => "Pipeline runtime failure",
        ErrorCode::DISPATCH_UNKNOWN_WORKER => "Unknown remote worker",
        ErrorCode::DISPATCH_HOOK_FAILED => "Run configuration hook failed",
        ErrorCode::DISPATCH_CANCELLED => "Execution cancelled",

        ErrorCode::REMOTE_GENERIC => "Remote worker error",
        ErrorCode::REMOTE_SUBMIT_FAILED => "Submission to remote worker failed",
        ErrorCode::REMOTE_UNREACHABLE => "Remote worker unreachable",
        ErrorCode::REMOTE_REJECTED => "Remote worker rejected the request",
        ErrorCode::REMOTE_UNTRUSTED => "Remote worker identity not trusted",
        ErrorCode::REMOTE_PROTOCOL => "Unexpected response from remote worker",

        ErrorCode::CLUSTER_GENERIC => "Cluster error",
        ErrorCode::CLUSTER_NO_TOPOLOGY => "No cluster topology available",
        ErrorCode::CLUSTER_SPLIT_FAILED => "Pipeline could not be split across the cluster",
        ErrorCode::CLUSTER_START_FAILED => "Cluster partition could not be started",
        ErrorCode::CLUSTER_MONITOR_FAILED => "Cluster monitoring failed",

        ErrorCode::LOG_GENERIC => "Log artifact error",
        ErrorCode::LOG_MISSING_NAME => "Log file name is empty",
        ErrorCode::LOG_PARENT_MISSING => "Log file parent folder does not exist",
        ErrorCode::LOG_OPEN_FAILED => "Log file could not be opened",
        ErrorCode::LOG_WRITE_FAILED => "Log file could not be written",

        ErrorCode::OTHER_GENERIC => "Unexpected error",
        ErrorCode::OTHER_IO => "I/O error",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_known_codes() {
        assert_eq!(
            describe_error_code(ErrorCode::REMOTE_UNREACHABLE),
            "Remote worker unreachable"
        );
        assert_eq!(
            describe_error_code(ErrorCode::LOG_MISSING_NAME),
            "Log file name is empty"
        );
    }

    #[test]
    fn test_describe_unknown_code() {
        assert_eq!(describe_error_code(4242), "Unknown error code");
    }
}
