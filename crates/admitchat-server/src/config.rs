use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub provider_base_url: String,
    pub system_prompt_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    provider: ProviderSection,
    #[serde(default)]
    prompt: PromptSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderSection {
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_base_url")]
    base_url: String,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct PromptSection {
    #[serde(default)]
    path: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(file_config) = load_from_file()? {
            return Ok(file_config.into());
        }

        Ok(Self::from_env())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn from_env() -> Self {
        let host = env::var("ADMITCHAT_SERVER_HOST").unwrap_or_else(|_| default_host());
        let port = env::var("ADMITCHAT_SERVER_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let model = env::var("ADMITCHAT_MODEL").unwrap_or_else(|_| default_model());
        let provider_base_url =
            env::var("ADMITCHAT_PROVIDER_BASE_URL").unwrap_or_else(|_| default_base_url());
        let system_prompt_path = env::var_os("ADMITCHAT_SYSTEM_PROMPT_PATH").map(PathBuf::from);

        Self {
            host,
            port,
            model,
            provider_base_url,
            system_prompt_path,
        }
    }
}

impl From<FileConfig> for ServerConfig {
    fn from(file_config: FileConfig) -> Self {
        Self {
            host: file_config.server.host,
            port: file_config.server.port,
            model: file_config.provider.model,
            provider_base_url: file_config.provider.base_url,
            system_prompt_path: file_config.prompt.path,
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("ADMITCHAT_SERVER_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("server.toml").exists() {
        Some("server.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    parse_file(Path::new(&path)).map(Some)
}

fn parse_file(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path.display(), err))?;
    toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_config_defaults() {
        let parsed: FileConfig = toml::from_str("").unwrap();
        let config = ServerConfig::from(parsed);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.provider_base_url, "https://api.openai.com/v1");
        assert!(config.system_prompt_path.is_none());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_file_config_sections() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("server.toml");
        fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 8088

[provider]
model = "gpt-4o-mini"
base_url = "http://localhost:11434/v1"

[prompt]
path = "prompts/custom.md"
"#,
        )
        .unwrap();

        let config = ServerConfig::from(parse_file(&path).unwrap());
        assert_eq!(config.bind_address(), "127.0.0.1:8088");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.provider_base_url, "http://localhost:11434/v1");
        assert_eq!(
            config.system_prompt_path.as_deref(),
            Some(Path::new("prompts/custom.md"))
        );
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        let err = parse_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
