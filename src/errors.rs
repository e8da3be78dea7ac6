use chrono::NaiveDate;
use thiserror::Error;

/// Failures of the search-and-download core. Per-band download problems are
/// not here on purpose: they land in `DownloadResult::issues` and the caller
/// still gets a result.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Malformed coordinates, date or window values. Raised before any
    /// network call.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The catalog returned zero matches. Recoverable: the caller may widen
    /// the day/degree windows and try again.
    #[error("no Sentinel-1 GRD scenes within +/-{day_window} days of {date}")]
    NoScenesFound { date: NaiveDate, day_window: u32 },

    /// Transport or decoding failure while talking to the catalog.
    #[error("catalog search failed")]
    SearchFailed(#[source] reqwest::Error),
}
