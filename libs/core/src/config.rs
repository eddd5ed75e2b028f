use anyhow::{Result, bail};

/// Process-level settings for the classification and response pipelines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreConfig {
    /// Raise the first captured error instead of collecting it.
    pub debug: bool,
}

impl CoreConfig {
    pub fn from_env() -> Result<Self> {
        let debug = match std::env::var("CHATWIRE_DEBUG") {
            Ok(raw) => parse_flag(&raw)?,
            Err(_) => false,
        };
        Ok(Self { debug })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => bail!("CHATWIRE_DEBUG must be a boolean flag, got `{other}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_flag_spellings() {
        assert!(parse_flag("1").unwrap());
        assert!(parse_flag(" TRUE ").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
