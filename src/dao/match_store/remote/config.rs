use super::error::{RemoteDaoError, RemoteResult};

const DEFAULT_TABLE: &str = "matches";

/// Runtime configuration describing how to reach the remote match table.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
}

impl RemoteConfig {
    /// Construct a configuration targeting the default `matches` table.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE.to_owned(),
        }
    }

    /// Target another table than [`DEFAULT_TABLE`].
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> RemoteResult<Self> {
        let base_url = std::env::var("REMOTE_BASE_URL").map_err(|_| {
            RemoteDaoError::MissingEnvVar {
                var: "REMOTE_BASE_URL",
            }
        })?;
        let api_key = std::env::var("REMOTE_API_KEY")
            .map_err(|_| RemoteDaoError::MissingEnvVar { var: "REMOTE_API_KEY" })?;

        let mut config = Self::new(base_url, api_key);
        if let Some(table) = std::env::var("REMOTE_TABLE")
            .ok()
            .filter(|table| !table.trim().is_empty())
        {
            config = config.with_table(table);
        }

        Ok(config)
    }
}
