use anyhow::{Result, bail};

pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_API_VERSION: &str = "v13.0";

/// Connection settings for the WhatsApp Cloud API.
///
/// `api_base` may be `mock://<scenario>` to answer locally without network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppConfig {
    pub api_base: String,
    pub api_version: String,
    pub phone_id: Option<String>,
    pub token: Option<String>,
}

impl WhatsAppConfig {
    pub fn new(phone_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            api_version: DEFAULT_API_VERSION.into(),
            phone_id: Some(phone_id.into()),
            token: Some(token.into()),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Reads `WA_API_BASE`, `FACEBOOK_API_VERSION`, `WHATSAPP_PHONE_ID` and `WHATSAPP_TOKEN`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let api_base = non_empty("WA_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into());
        let api_version =
            non_empty("FACEBOOK_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.into());
        if !api_version.starts_with('v') {
            bail!("FACEBOOK_API_VERSION must look like `v13.0`, got `{api_version}`");
        }
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_version,
            phone_id: non_empty("WHATSAPP_PHONE_ID"),
            token: non_empty("WHATSAPP_TOKEN"),
        })
    }

    pub fn mock_scenario(&self) -> Option<&str> {
        self.api_base.strip_prefix("mock://")
    }

    /// `{base}/{version}/{path}` on the Graph API.
    pub fn graph_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_base.trim_end_matches('/'),
            self.api_version,
            path.trim_start_matches('/')
        )
    }
}
