use serde::{Deserialize, Serialize};

fn d_smtp_server() -> String {
    "smtp.qq.com".to_string()
}
fn d_smtp_port() -> u16 {
    465
}
fn d_true() -> bool {
    true
}

/// `spec.md` §6: `email: {smtp_server, smtp_port, smtp_ssl, smtp_user,
/// smtp_auth_code?, default_sender, default_recipient}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "d_smtp_server")]
    pub smtp_server: String,
    #[serde(default = "d_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "d_true")]
    pub smtp_ssl: bool,
    #[serde(default)]
    pub smtp_user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_auth_code: Option<String>,
    #[serde(default)]
    pub default_sender: String,
    #[serde(default)]
    pub default_recipient: String,
    /// Stored prompt the realtime daily-first-start task asks the LLM to
    /// expand into `{subject, body}` (`spec.md` §4.10). Unset disables the
    /// realtime task entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_prompt: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: d_smtp_server(),
            smtp_port: d_smtp_port(),
            smtp_ssl: true,
            smtp_user: String::new(),
            smtp_auth_code: None,
            default_sender: String::new(),
            default_recipient: String::new(),
            daily_prompt: None,
        }
    }
}
