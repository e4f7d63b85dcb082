//! Log filter selection

/// Filter for a `-v` count
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Pick the tracing filter: `-v` flags first, then `PIPEFLOW_LOG`, then the
/// settings' `log_level`, then `info`
pub fn log_filter(verbose: u8, env: Option<String>, configured: Option<String>) -> String {
    if verbose > 0 {
        return get_log_level(verbose).to_string();
    }
    env.filter(|v| !v.trim().is_empty())
        .or_else(|| configured.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| get_log_level(0).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_wins() {
        assert_eq!(log_filter(1, Some("warn".into()), None), "debug");
        assert_eq!(log_filter(3, None, None), "trace");
    }

    #[test]
    fn test_env_before_settings() {
        assert_eq!(
            log_filter(0, Some("warn".into()), Some("error".into())),
            "warn"
        );
        assert_eq!(log_filter(0, None, Some("error".into())), "error");
        assert_eq!(log_filter(0, Some(" ".into()), None), "info");
    }
}
