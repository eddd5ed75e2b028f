/// Label set attached to every counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryLabels {
    pub platform: String,
    pub account: Option<String>,
    pub sender: Option<String>,
    pub msg_id: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl TelemetryLabels {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            ..Default::default()
        }
    }

    pub fn tags(&self) -> Vec<(String, String)> {
        let mut tags = Vec::with_capacity(4 + self.extra.len());
        tags.push(("platform".into(), self.platform.clone()));
        if let Some(account) = &self.account {
            tags.push(("account".into(), account.clone()));
        }
        if let Some(sender) = &self.sender {
            tags.push(("sender".into(), sender.clone()));
        }
        if let Some(msg) = &self.msg_id {
            tags.push(("msg_id".into(), msg.clone()));
        }
        for (key, value) in &self.extra {
            tags.push((key.clone(), value.clone()));
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_skip_missing_fields_and_keep_extra_order() {
        let mut labels = TelemetryLabels::new("whatsapp");
        labels.account = Some("pn-1".into());
        labels.extra.push(("kind".into(), "text".into()));
        labels.extra.push(("outcome".into(), "ok".into()));
        assert_eq!(
            labels.tags(),
            vec![
                ("platform".to_string(), "whatsapp".to_string()),
                ("account".to_string(), "pn-1".to_string()),
                ("kind".to_string(), "text".to_string()),
                ("outcome".to_string(), "ok".to_string()),
            ]
        );
    }
}
