use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Graph store
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Asset-upload collaborator. When unset, only already-hosted image
    // URLs are accepted on spot creation.
    pub asset_upload_url: Option<String>,
    pub asset_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            neo4j_uri: required_env("NEO4J_URI"),
            neo4j_user: required_env("NEO4J_USER"),
            neo4j_password: required_env("NEO4J_PASSWORD"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            asset_upload_url: env::var("ASSET_UPLOAD_URL").ok(),
            asset_api_key: env::var("ASSET_API_KEY").ok(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
