//! Error types for normalization, extraction, fetching and export
//!
//! Every variant carries the text, URL or heading that caused it so a log
//! line is enough to find the offending listing. Only
//! [`CatalogError::BoundResolution`] stops a run; everything else is
//! recovered at the record or resource level.

use std::num::{ParseFloatError, ParseIntError};

/// A raw field could not be turned into the expected numeric type
///
/// Produced by the functions in [`crate::normalize`]. The original text is
/// kept verbatim so anomalies can be reported against the source page.
///
/// # Examples
///
/// ```ignore
/// use listing_harvest::{normalize, FormatError};
///
/// match normalize::parse_money("$") {
///     Err(FormatError::MissingToken { text, position }) => {
///         eprintln!("no token {} in '{}'", position, text);
///     }
///     other => println!("{:?}", other),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The whitespace-delimited token at `position` does not exist
    #[error("Missing token {position} in '{text}'")]
    MissingToken { text: String, position: usize },

    /// The selected token is not an integer
    #[error("Invalid integer: {text}")]
    InvalidInteger {
        text: String,
        #[source]
        source: ParseIntError,
    },

    /// The selected token is not a floating point number
    #[error("Invalid float: {text}")]
    InvalidFloat {
        text: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Markup that a heading promised is not there
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    /// The heading is not followed by a table element
    #[error("Heading '{heading}' is not followed by a table")]
    MissingTable { heading: String },

    /// The table after the heading has no row with a cell
    #[error("Table after heading '{heading}' has no cell")]
    MissingRow { heading: String },
}

/// Failure surfaced by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The request never produced a response (timeout, DNS, reset...)
    #[error("GET {url} failed: {message}")]
    Transport {
        url: String,
        message: String,
        retryable: bool,
    },

    /// Every attempt allowed by the retry policy failed
    #[error("GET {url} gave up after {attempts} attempts")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed
    ///
    /// Rate limiting (429) and server errors (5xx) are transient, as are
    /// transport failures flagged retryable by the fetcher. Client errors
    /// such as 404 are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            FetchError::Transport { retryable, .. } => *retryable,
            FetchError::Exhausted { .. } => false,
        }
    }

    /// URL of the resource that failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Exhausted { url, .. } => url,
        }
    }
}

/// Errors that can occur while validating configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Crawling concurrency must be greater than 0
    #[error("Crawling concurrency must be greater than 0, got {0}")]
    InvalidCrawlingConcurrency(usize),

    /// Processing concurrency must be greater than 0
    #[error("Processing concurrency must be greater than 0, got {0}")]
    InvalidProcessingConcurrency(usize),

    /// Queue multiplier must be greater than 0
    #[error("Queue multiplier must be greater than 0, got {0}")]
    InvalidQueueMultiplier(usize),

    /// A retry policy needs at least one attempt
    #[error("Retry attempts must be greater than 0, got {0}")]
    InvalidRetryAttempts(u32),

    /// The catalog site is not an absolute http(s) URL
    #[error("Invalid catalog site URL '{0}'")]
    InvalidSiteUrl(String),
}

/// Errors that abort a catalog run
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The first index page could not be fetched, so the page count is unknown
    #[error("Could not resolve the pagination bound from {url}")]
    BoundResolution {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The catalog was configured with invalid values
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that can occur while writing the CSV export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error while exporting: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error while exporting: {0}")]
    Csv(#[from] csv::Error),
}
