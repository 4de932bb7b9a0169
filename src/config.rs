use std::path::PathBuf;

/// Configuration from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the download service, without trailing slash
    pub server: String,
    /// Where finished files are saved
    pub download_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("VIDGRAB_SERVER").ok(),
            std::env::var("VIDGRAB_DOWNLOAD_DIR").ok(),
        )
    }

    fn from_vars(server: Option<String>, download_dir: Option<String>) -> Self {
        Self {
            server: server
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "http://127.0.0.1:5000".to_string()),
            download_dir: download_dir
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./downloads")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_vars(None, None);
        assert_eq!(config.server, "http://127.0.0.1:5000");
        assert_eq!(config.download_dir, PathBuf::from("./downloads"));
    }

    #[test]
    fn server_loses_trailing_slash() {
        let config = Config::from_vars(Some("https://dl.example.com/ ".into()), Some("/tmp/x".into()));
        assert_eq!(config.server, "https://dl.example.com");
        assert_eq!(config.download_dir, PathBuf::from("/tmp/x"));
    }
}
