use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::CONFIG;

/// One search-and-download request. Built from CLI flags, the HTTP form
/// endpoint, or the arguments of an agent tool call.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchRequest {
    pub lat: f64,
    pub lon: f64,
    pub date: NaiveDate,
    #[serde(default = "default_day_window")]
    pub day_window: u32,
    #[serde(default = "default_deg_window")]
    pub deg_window: f64,
}

fn default_day_window() -> u32 {
    CONFIG.days_margin
}

fn default_deg_window() -> f64 {
    CONFIG.deg_margin
}

impl SearchRequest {
    pub fn new(lat: f64, lon: f64, date: NaiveDate) -> SearchRequest {
        SearchRequest {
            lat,
            lon,
            date,
            day_window: CONFIG.days_margin,
            deg_window: CONFIG.deg_margin,
        }
    }
}

/// Sentinel-1 polarization bands we try to download for every scene.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    VV,
    VH,
}

impl Band {
    pub const ALL: [Band; 2] = [Band::VV, Band::VH];

    /// Asset key in the STAC item (earth-search uses lowercase keys).
    pub fn asset_key(&self) -> &'static str {
        match self {
            Band::VV => "vv",
            Band::VH => "vh",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Band::VV => "VV",
            Band::VH => "VH",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BandFile {
    pub band: Band,
    pub path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Both bands saved.
    Success,
    /// Exactly one band saved.
    Partial,
    /// No band saved; still a normal return, not an error.
    Failure,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DownloadResult {
    pub scene_id: String,
    pub acquired_at: DateTime<Utc>,
    pub files: Vec<BandFile>,
    /// Per-band problems (missing asset, failed download). Informational only.
    pub issues: Vec<String>,
    pub status: DownloadStatus,
}

impl DownloadResult {
    pub fn new(
        scene_id: String,
        acquired_at: DateTime<Utc>,
        files: Vec<BandFile>,
        issues: Vec<String>,
    ) -> DownloadResult {
        let status = match files.len() {
            0 => DownloadStatus::Failure,
            n if n == Band::ALL.len() => DownloadStatus::Success,
            _ => DownloadStatus::Partial,
        };
        DownloadResult {
            scene_id,
            acquired_at,
            files,
            issues,
            status,
        }
    }
}
