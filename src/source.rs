use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, error};

use crate::error::{Error, Result};

const HIGHSCORES_URL: &str = "https://www.geoguessr.com/api/v3/results/highscores";
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Source of a raw highscores payload
pub trait ResultsSource {
    fn load(&self) -> Result<String>;
}

/// Production source: a single unauthenticated GET against the results API
pub struct HttpResultsSource {
    game_id: String,
    client: Client,
}

impl HttpResultsSource {
    pub fn new(game_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(concat!("roundclock/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            game_id: game_id.into(),
            client,
        })
    }

    pub fn url(&self) -> String {
        highscores_url(&self.game_id)
    }
}

impl ResultsSource for HttpResultsSource {
    fn load(&self) -> Result<String> {
        let url = self.url();
        debug!(%url, "fetching highscores");

        let response = self.client.get(&url).send().map_err(|e| {
            error!(%url, error = %e, "error fetching results");
            if e.is_timeout() {
                Error::Fetch(format!("request timed out after {FETCH_TIMEOUT_SECS} seconds"))
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(%url, status = status.as_u16(), "results endpoint refused");
            return Err(Error::Fetch(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            )));
        }

        Ok(response.text()?)
    }
}

/// Reads a saved payload from disk, or stdin for `-`
#[derive(Debug, Clone)]
pub struct FileResultsSource {
    path: PathBuf,
}

impl FileResultsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultsSource for FileResultsSource {
    fn load(&self) -> Result<String> {
        if self.path.as_os_str() == "-" {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        debug!(path = %self.path.display(), "reading highscores file");
        Ok(fs::read_to_string(&self.path)?)
    }
}

/// In-memory source for tests
#[derive(Debug, Clone)]
pub struct StaticResultsSource {
    payload: String,
}

impl StaticResultsSource {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl ResultsSource for StaticResultsSource {
    fn load(&self) -> Result<String> {
        Ok(self.payload.clone())
    }
}

pub fn highscores_url(game_id: &str) -> String {
    format!("{HIGHSCORES_URL}/{game_id}?friends=false&limit=9999&minRounds=1")
}

/// Game id from a results page URL/path, or a bare id
pub fn game_id_from_url(input: &str) -> Option<String> {
    static RESULTS_PATH: OnceLock<Regex> = OnceLock::new();
    static BARE_ID: OnceLock<Regex> = OnceLock::new();

    let results_path = RESULTS_PATH
        .get_or_init(|| Regex::new(r"/results/([a-zA-Z0-9]+)").expect("valid regex"));
    if let Some(caps) = results_path.captures(input) {
        return Some(caps[1].to_string());
    }

    let bare = BARE_ID.get_or_init(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("valid regex"));
    let trimmed = input.trim();
    bare.is_match(trimmed).then(|| trimmed.to_string())
}
