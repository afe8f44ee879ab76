use std::env;
use thiserror::Error;

pub const DEFAULT_TABLE_NAME: &str = "worknest";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Runtime settings, read once when the lambda cold-starts.
#[derive(Debug, Clone)]
pub struct Config {
    /// DynamoDB table holding tasks and users
    pub table_name: String,
    /// HMAC secret for bearer tokens
    pub jwt_secret: String,
    /// Value for `Access-Control-Allow-Origin`
    pub client_url: String,
    /// Registrations presenting this value become admins. Unset disables admin signup.
    pub admin_invite_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            table_name: non_empty("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            jwt_secret: non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            client_url: non_empty("CLIENT_URL").unwrap_or_else(|| "*".to_string()),
            admin_invite_token: non_empty("ADMIN_INVITE_TOKEN"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.table_name, "worknest");
        assert_eq!(config.client_url, "*");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.admin_invite_token, None);
    }

    #[test]
    fn jwt_secret_is_required() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
        assert_eq!(err.to_string(), "JWT_SECRET must be set");
    }

    #[test]
    fn explicit_values_win() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "k"),
            ("TABLE_NAME", "worknest-prod"),
            ("CLIENT_URL", "https://app.worknest.dev"),
            ("ADMIN_INVITE_TOKEN", "invite-42"),
        ]))
        .unwrap();
        assert_eq!(config.admin_invite_token.as_deref(), Some("invite-42"));
        assert_eq!(config.table_name, "worknest-prod");
        assert_eq!(config.client_url, "https://app.worknest.dev");
    }
}
