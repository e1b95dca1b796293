use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I'm having trouble connecting. Please try again later.";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default = "default_email_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            endpoint: default_email_endpoint(),
            service_id: String::new(),
            template_id: String::new(),
            public_key: String::new(),
            private_key: None,
            timeout_secs: None,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            fallback_message: default_fallback_message(),
            contact: None,
            user_name: None,
            priority: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(content).context("failed to parse config toml")?;
        if cfg.backend.base_url.trim().is_empty() {
            bail!("backend.base_url must not be empty");
        }
        Ok(cfg)
    }

    pub fn resolve(path: Option<&Path>, default_path: &Path) -> Result<Self> {
        Self::resolve_with(path, default_path, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(
        path: Option<&Path>,
        default_path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::load(path)?,
            None if default_path.exists() => Self::load(default_path)?,
            None => Self::default(),
        };
        cfg.apply_env(lookup);
        Ok(cfg)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *target = value;
            }
        };
        set(&mut self.backend.base_url, "QUERYDESK_BACKEND_URL");
        set(&mut self.email.service_id, "QUERYDESK_EMAIL_SERVICE_ID");
        set(&mut self.email.template_id, "QUERYDESK_EMAIL_TEMPLATE_ID");
        set(&mut self.email.public_key, "QUERYDESK_EMAIL_PUBLIC_KEY");
        if let Some(value) = lookup("QUERYDESK_EMAIL_PRIVATE_KEY").filter(|v| !v.trim().is_empty())
        {
            self.email.private_key = Some(value);
        }
    }

    pub fn require_email(&self) -> Result<()> {
        let email = &self.email;
        if email.service_id.trim().is_empty()
            || email.template_id.trim().is_empty()
            || email.public_key.trim().is_empty()
        {
            bail!("email.service_id, email.template_id and email.public_key are required");
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_email_endpoint() -> String {
    "https://api.emailjs.com/api/v1.0/email/send".to_string()
}

fn default_fallback_message() -> String {
    DEFAULT_FALLBACK_MESSAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert_eq!(cfg.backend.timeout_secs, None);
        assert_eq!(cfg.chat.fallback_message, DEFAULT_FALLBACK_MESSAGE);
        assert!(cfg.require_email().is_err());
    }

    #[test]
    fn parses_all_sections() {
        let cfg = Config::from_toml(
            r#"
            [backend]
            base_url = "http://api.internal:9000"
            timeout_secs = 15

            [email]
            service_id = "svc"
            template_id = "tpl"
            public_key = "pub"

            [chat]
            contact = "visitor@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.backend.timeout_secs, Some(15));
        assert_eq!(cfg.chat.contact.as_deref(), Some("visitor@example.com"));
        assert!(cfg.require_email().is_ok());
    }

    #[test]
    fn rejects_blank_base_url() {
        let err = Config::from_toml("[backend]\nbase_url = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn env_overrides_credentials() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("QUERYDESK_EMAIL_SERVICE_ID", "svc"),
            ("QUERYDESK_EMAIL_TEMPLATE_ID", "tpl"),
            ("QUERYDESK_EMAIL_PUBLIC_KEY", "pub"),
            ("QUERYDESK_EMAIL_PRIVATE_KEY", "secret"),
            ("QUERYDESK_BACKEND_URL", ""),
        ]);
        let mut cfg = Config::default();
        cfg.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.email.service_id, "svc");
        assert_eq!(cfg.email.private_key.as_deref(), Some("secret"));
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert!(cfg.require_email().is_ok());
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let cfg = Config::resolve_with(None, &dir.path().join("querydesk.toml"), no_env).unwrap();
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert_eq!(cfg.chat.fallback_message, DEFAULT_FALLBACK_MESSAGE);
    }

    #[test]
    fn default_file_is_loaded_when_present() {
        let dir = tempdir().unwrap();
        let default_path = dir.path().join("querydesk.toml");
        fs::write(&default_path, "[backend]\nbase_url = \"http://default:1\"\n").unwrap();

        let cfg = Config::resolve_with(None, &default_path, no_env).unwrap();
        assert_eq!(cfg.backend.base_url, "http://default:1");
    }

    #[test]
    fn explicit_path_wins_over_default() {
        let dir = tempdir().unwrap();
        let default_path = dir.path().join("querydesk.toml");
        let explicit = dir.path().join("staging.toml");
        fs::write(&default_path, "[backend]\nbase_url = \"http://default:1\"\n").unwrap();
        fs::write(&explicit, "[backend]\nbase_url = \"http://staging:2\"\n").unwrap();

        let cfg = Config::resolve_with(Some(&explicit), &default_path, no_env).unwrap();
        assert_eq!(cfg.backend.base_url, "http://staging:2");
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempdir().unwrap();
        let default_path = dir.path().join("querydesk.toml");
        fs::write(&default_path, "").unwrap();
        let explicit = dir.path().join("absent.toml");

        let err = Config::resolve_with(Some(&explicit), &default_path, no_env).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn env_applies_after_file() {
        let dir = tempdir().unwrap();
        let default_path = dir.path().join("querydesk.toml");
        fs::write(&default_path, "[email]\nservice_id = \"from-file\"\n").unwrap();

        let cfg = Config::resolve_with(None, &default_path, |key| {
            (key == "QUERYDESK_EMAIL_SERVICE_ID").then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(cfg.email.service_id, "from-env");
    }
}
