use faststr::FastStr;

pub const DEFAULT_RELAY_URL: &str = "http://localhost:3000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://lawchat.db";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_url:    FastStr,
    pub database_url: FastStr,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(FastStr::from)
                .unwrap_or_else(|| FastStr::from_static_str(default))
        };
        Self {
            relay_url:    var("LAWCHAT_RELAY_URL", DEFAULT_RELAY_URL),
            database_url: var("LAWCHAT_DATABASE_URL", DEFAULT_DATABASE_URL),
        }
    }
}
