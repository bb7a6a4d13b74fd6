use std::collections::HashMap;
use std::net::IpAddr;

use serde::Deserialize;

use crate::error::Error;

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_HTTP_PORT: u16 = 4040;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

const MISSING_SMTP: &str =
    "SMTP configuration missing. Please set SMTP_HOST, SMTP_USER, SMTP_PASS in .env";

/// Process-wide settings, loaded once at startup and read-only afterwards.
///
/// Every key is optional here; SMTP credentials are only enforced when a
/// transport is built so the server can still start (and report healthy)
/// without them.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_secure: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub mail_from: Option<String>,
    pub mail_to: Option<String>,
    pub port: Option<u16>,
    pub bind_addr: Option<String>,
    pub trust_proxy: Option<String>,
}

/// SMTP connection settings as read from the environment
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub secure: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// SMTP settings that passed validation
#[derive(Clone, Debug, PartialEq)]
pub struct SmtpCredentials {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: String,
    pub password: String,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn is_true(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl Settings {
    /// Loads settings from an optional TOML file merged with the process
    /// environment. Environment variables win over the file.
    pub fn load(path: Option<&str>) -> Result<Self, Error> {
        Self::load_from(path, None)
    }

    /// Same as `load`, but reads variables from `env` instead of the
    /// process environment when given.
    pub fn load_from(path: Option<&str>, env: Option<HashMap<String, String>>) -> Result<Self, Error> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Empty variables behave like unset ones
        let environment = config::Environment::default()
            .ignore_empty(true)
            .source(env);

        let settings = builder
            .add_source(environment)
            .build()?
            .try_deserialize::<Self>()?;

        Ok(settings)
    }

    pub fn smtp(&self) -> SmtpConfig {
        SmtpConfig {
            host: non_empty(&self.smtp_host),
            port: self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            secure: is_true(&self.smtp_secure),
            username: non_empty(&self.smtp_user),
            password: non_empty(&self.smtp_pass),
        }
    }

    /// MAIL_FROM, falling back to SMTP_USER
    pub fn sender(&self) -> String {
        non_empty(&self.mail_from)
            .or_else(|| non_empty(&self.smtp_user))
            .unwrap_or_default()
    }

    /// MAIL_TO, falling back to SMTP_USER
    pub fn recipient(&self) -> String {
        non_empty(&self.mail_to)
            .or_else(|| non_empty(&self.smtp_user))
            .unwrap_or_default()
    }

    pub fn http_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_HTTP_PORT)
    }

    pub fn bind_addr(&self) -> Result<IpAddr, Error> {
        let addr = non_empty(&self.bind_addr).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        addr.parse()
            .map_err(|_| Error::Config(format!("BIND_ADDR is not an IP address: {}", addr)))
    }

    pub fn trust_proxy(&self) -> bool {
        is_true(&self.trust_proxy)
    }
}

impl SmtpConfig {
    /// Checks that host, username and password are all present
    pub fn credentials(&self) -> Result<SmtpCredentials, Error> {
        match (&self.host, &self.username, &self.password) {
            (Some(host), Some(username), Some(password)) => Ok(SmtpCredentials {
                host: host.clone(),
                port: self.port,
                secure: self.secure,
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(Error::ConfigMissing(MISSING_SMTP.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(vars: &[(&str, &str)]) -> Settings {
        Settings::load_from(None, Some(env(vars))).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = load(&[]);
        let smtp = settings.smtp();

        assert_eq!(smtp.port, 587);
        assert!(!smtp.secure);
        assert_eq!(settings.http_port(), 4040);
        assert_eq!(settings.bind_addr().unwrap().to_string(), "0.0.0.0");
        assert!(!settings.trust_proxy());
    }

    #[test]
    fn test_load_smtp_settings() {
        let settings = load(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_SECURE", "TRUE"),
            ("SMTP_USER", "relay@example.com"),
            ("SMTP_PASS", "hunter2"),
            ("PORT", "8080"),
        ]);
        let smtp = settings.smtp();

        assert_eq!(smtp.host.as_deref(), Some("smtp.example.com"));
        assert_eq!(smtp.port, 465);
        assert!(smtp.secure);
        assert_eq!(settings.http_port(), 8080);
    }

    #[test]
    fn test_secure_only_when_true() {
        assert!(!load(&[("SMTP_SECURE", "yes")]).smtp().secure);
        assert!(!load(&[("SMTP_SECURE", "1")]).smtp().secure);
        assert!(load(&[("SMTP_SECURE", "True")]).smtp().secure);
    }

    #[test]
    fn test_malformed_port() {
        let result = Settings::load_from(None, Some(env(&[("SMTP_PORT", "abc")])));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_sender_and_recipient_fallback() {
        let settings = load(&[("SMTP_USER", "relay@example.com")]);
        assert_eq!(settings.sender(), "relay@example.com");
        assert_eq!(settings.recipient(), "relay@example.com");

        let settings = load(&[
            ("SMTP_USER", "relay@example.com"),
            ("MAIL_FROM", "forms@example.com"),
            ("MAIL_TO", "team@example.com"),
        ]);
        assert_eq!(settings.sender(), "forms@example.com");
        assert_eq!(settings.recipient(), "team@example.com");
    }

    #[test]
    fn test_credentials_required() {
        let complete = [
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "relay@example.com"),
            ("SMTP_PASS", "hunter2"),
        ];
        assert!(load(&complete).smtp().credentials().is_ok());

        for missing in 0..complete.len() {
            let vars: Vec<_> = complete
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != missing)
                .map(|(_, kv)| *kv)
                .collect();

            let err = load(&vars).smtp().credentials().unwrap_err();
            assert!(matches!(err, Error::ConfigMissing(_)));
            assert!(err.to_string().contains("SMTP_HOST, SMTP_USER, SMTP_PASS"));
        }
    }

    #[test]
    fn test_empty_values_are_missing() {
        let settings = load(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "relay@example.com"),
            ("SMTP_PASS", ""),
        ]);
        assert!(settings.smtp().credentials().is_err());
    }

    #[test]
    fn test_whitespace_values_are_kept() {
        let settings = Settings {
            smtp_host: Some("smtp.example.com".into()),
            smtp_user: Some("relay@example.com".into()),
            smtp_pass: Some("  ".into()),
            mail_to: Some(" ".into()),
            smtp_secure: Some(" true".into()),
            ..Default::default()
        };

        let creds = settings.smtp().credentials().unwrap();
        assert_eq!(creds.password, "  ");
        assert!(!creds.secure);
        assert_eq!(settings.recipient(), " ");
    }

    #[test]
    fn test_credentials_ignore_port_and_secure() {
        let smtp = SmtpConfig {
            host: Some("h".into()),
            port: 0,
            secure: true,
            username: Some("u".into()),
            password: Some("p".into()),
        };
        let creds = smtp.credentials().unwrap();
        assert_eq!(creds.port, 0);
        assert!(creds.secure);
    }
}
