use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

use crate::client::FenceClient;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// What `fencectl` remembers between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub base_url: String,
    pub token: Option<String>,
    pub email: Option<String>,
    /// Organization sent as `X-Organization-Id`; the server picks one when unset.
    pub organization_id: Option<Uuid>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            email: None,
            organization_id: None,
        }
    }
}

impl Session {
    pub fn client(&self) -> anyhow::Result<FenceClient> {
        let mut client = FenceClient::new(&self.base_url)?;
        if let Some(token) = &self.token {
            client = client.with_token(token.clone());
        }
        if let Some(org_id) = self.organization_id {
            client = client.with_organization(org_id);
        }
        Ok(client)
    }

    /// Client for commands that need a logged-in session.
    pub fn authenticated_client(&self) -> anyhow::Result<FenceClient> {
        if self.token.is_none() {
            anyhow::bail!("Not logged in; run `fencectl auth login` first");
        }
        self.client()
    }

    pub fn clear_credentials(&mut self) {
        self.token = None;
        self.email = None;
        self.organization_id = None;
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("FENCECTL_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("fencectl")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

fn session_file() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join("session.json"))
}

pub fn load_session() -> anyhow::Result<Session> {
    let path = session_file()?;
    if !path.exists() {
        return Ok(Session::default());
    }

    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_session(session: &Session) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(session)?;
    fs::write(session_file()?, content)?;
    Ok(())
}
