//! Error type for `linktrack-sources`.
//!
//! Callers treat every variant as "source unavailable for this link right
//! now"; none of them is fatal to a scan.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("link not supported by {source_name}: {url}")]
  UnsupportedLink { source_name: &'static str, url: String },

  #[error("{source_name} unavailable: {reason}")]
  SourceUnavailable { source_name: &'static str, reason: String },

  /// The HTTP client itself could not be built.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

impl Error {
  /// A transport or decoding failure while talking to `source_name`.
  pub(crate) fn unavailable(source_name: &'static str, e: impl std::fmt::Display) -> Self {
    Error::SourceUnavailable { source_name, reason: e.to_string() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
