//! `${VAR}` expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the configuration key for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} {}", e.var_name, e.cause),
        })
}

/// Expand an optional value, leaving `None` untouched.
pub(crate) fn expand_opt(value: Option<&str>, field: &str) -> Result<Option<String>, ConfigError> {
    value.map(|v| expand_env(v, field)).transpose()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_plain_value_is_unchanged() {
        assert_eq!(expand_env("https://kroki.io", "f").unwrap(), "https://kroki.io");
    }

    #[test]
    fn test_default_used_when_unset() {
        let value = expand_env("${QUIRE_TEST_SURELY_UNSET:-fallback}", "f").unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn test_unset_without_default_names_field() {
        let err = expand_env("${QUIRE_TEST_SURELY_UNSET}", "typeset.kroki_url").unwrap_err();
        match err {
            ConfigError::EnvVar { field, message } => {
                assert_eq!(field, "typeset.kroki_url");
                assert!(message.contains("QUIRE_TEST_SURELY_UNSET"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
