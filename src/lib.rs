// Library surface shared by the binary and the integration tests.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod prefs;
pub mod report;
pub mod results;
pub mod session;
pub mod source;
pub mod tags;
pub mod timing;
pub mod util;

pub use error::{Error, Result};
pub use session::{PlayerSession, RoundRecord};
pub use timing::{summarize, summarize_with, InvalidSessionPolicy, RoundDetail, SessionSummary};
