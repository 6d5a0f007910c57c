use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use common::{CsrfToken, GameIdentity};
use session::Settings;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] io::Error),
    #[error("config file incorrectly formatted: {0}")]
    Format(#[from] toml::de::Error),
    #[error("invalid server address: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported server scheme {0:?}, only http is spoken")]
    UnsupportedScheme(String),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    pub server: String,
    pub gamename: Option<String>,
    pub csrf_token: Option<String>,
    /// Full `Cookie` header value of an authenticated session.
    pub session_cookie: Option<String>,
    /// Follow the move feed as this user and fetch the board when the opponent moves.
    pub watch_username: Option<String>,
    #[serde(default = "default_refresh_delay")]
    pub refresh_delay: Duration,
    #[serde(default = "default_square_px")]
    pub square_px: i64,
}

fn default_refresh_delay() -> Duration {
    Duration::from_millis(300)
}

fn default_square_px() -> i64 {
    64
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let mut file = File::open(&path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Config::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.server_url()?;
        Ok(config)
    }

    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.server)?;
        if url.scheme() != "http" {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_owned()));
        }
        Ok(url)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            refresh_delay: self.refresh_delay,
            square_px: self.square_px,
        }
    }

    pub fn game(&self) -> Option<GameIdentity> {
        self.gamename.clone().map(GameIdentity)
    }

    pub fn csrf(&self) -> Option<CsrfToken> {
        self.csrf_token.clone().map(CsrfToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_takes_defaults() {
        let config = Config::from_toml(r#"server = "http://127.0.0.1:5000""#).unwrap();

        assert_eq!(config.refresh_delay, Duration::from_millis(300));
        assert_eq!(config.square_px, 64);
        assert!(config.game().is_none());
        assert_eq!(config.server_url().unwrap().port(), Some(5000));
    }

    #[test]
    fn full_config() {
        let config = Config::from_toml(
            r#"
            server = "http://localhost:5000/"
            gamename = "game01"
            csrf_token = "tok3n"
            session_cookie = "session=abc"
            watch_username = "alice"
            square_px = 48
            refresh_delay = { secs = 0, nanos = 150000000 }
            "#,
        ).unwrap();

        assert_eq!(config.game(), Some(GameIdentity("game01".to_owned())));
        assert_eq!(config.csrf(), Some(CsrfToken("tok3n".to_owned())));
        assert_eq!(config.watch_username.as_ref().map(String::as_str), Some("alice"));
        assert_eq!(
            config.settings(),
            Settings { refresh_delay: Duration::from_millis(150), square_px: 48 }
        );
    }

    #[test]
    fn https_is_refused() {
        match Config::from_toml(r#"server = "https://example.com""#) {
            Err(ConfigError::UnsupportedScheme(scheme)) => assert_eq!(scheme, "https"),
            other => panic!("expected scheme error, got {:?}", other),
        }
    }

    #[test]
    fn missing_server_is_a_format_error() {
        match Config::from_toml(r#"gamename = "game01""#) {
            Err(ConfigError::Format(_)) => (),
            other => panic!("expected format error, got {:?}", other),
        }
    }
}
