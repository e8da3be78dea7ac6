use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use tokio_util::io::StreamReader;

use crate::catalog::{SENTINEL1_GRD, SearchBody, StacCatalog, StacItem};
use crate::data_models::{Band, BandFile, DownloadResult, SearchRequest};
use crate::errors::FetchError;

/// Page size for the catalog search. One page is plenty for a +/-N day,
/// +/-D degree window.
const SEARCH_LIMIT: u32 = 50;

/// Finds the Sentinel-1 GRD scene closest to the requested date and saves its
/// VV/VH bands under `save_dir`.
#[derive(Debug, Clone)]
pub struct SceneFinder {
    catalog: StacCatalog,
    save_dir: PathBuf,
}

impl SceneFinder {
    pub fn new(catalog: StacCatalog, save_dir: impl Into<PathBuf>) -> SceneFinder {
        SceneFinder {
            catalog,
            save_dir: save_dir.into(),
        }
    }

    /// The one operation this crate exists for: search, pick, download.
    ///
    /// Per-band problems (missing asset, failed transfer) never abort the
    /// call; they are recorded in `DownloadResult::issues` and reflected in
    /// the status. Hard failures are bad parameters, an empty search window,
    /// or the catalog being unreachable.
    pub async fn find_and_download(
        &self,
        req: &SearchRequest,
    ) -> Result<DownloadResult, FetchError> {
        validate(req)?;

        let body = SearchBody {
            collections: vec![SENTINEL1_GRD.to_string()],
            bbox: bounding_box(req.lat, req.lon, req.deg_window),
            datetime: datetime_range(req.date, req.day_window),
            limit: SEARCH_LIMIT,
        };
        let items = self.catalog.search(&body).await?;

        let center = req.date.and_time(NaiveTime::MIN).and_utc();
        let Some((item, acquired_at)) = select_nearest(&items, center) else {
            return Err(FetchError::NoScenesFound {
                date: req.date,
                day_window: req.day_window,
            });
        };
        log::info!("selected scene {} acquired at {}", item.id, acquired_at);

        let mut files = Vec::new();
        let mut issues = Vec::new();
        match tokio::fs::create_dir_all(&self.save_dir).await {
            Ok(()) => {
                for band in Band::ALL {
                    match item.assets.get(band.asset_key()) {
                        Some(asset) => {
                            let url = s3_to_http(&asset.href);
                            let dest = self
                                .save_dir
                                .join(format!("{}_{}.tif", item.id, band.asset_key()));
                            match self.download_band(&url, &dest).await {
                                Ok(()) => {
                                    log::info!("saved {} to {}", band, dest.display());
                                    files.push(BandFile { band, path: dest });
                                }
                                Err(e) => {
                                    log::error!("error downloading {band}, error: {e:#}");
                                    issues.push(format!("{band} download failed: {e:#}"));
                                }
                            }
                        }
                        None => issues.push(format!("scene has no {band} asset")),
                    }
                }
            }
            Err(e) => issues.push(format!(
                "could not create save dir {}: {e}",
                self.save_dir.display()
            )),
        }

        Ok(DownloadResult::new(item.id.clone(), acquired_at, files, issues))
    }

    async fn download_band(&self, url: &str, dest: &Path) -> Result<()> {
        let res = self
            .catalog
            .client()
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()?;

        let stream = res.bytes_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(stream);
        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("failed to create {}", dest.display()))?;
        tokio::io::copy(&mut reader, &mut file)
            .await
            .context("download interrupted")?;
        Ok(())
    }
}

fn validate(req: &SearchRequest) -> Result<(), FetchError> {
    if !req.lat.is_finite() || !(-90.0..=90.0).contains(&req.lat) {
        return Err(FetchError::InvalidParameters(format!(
            "latitude {} outside [-90, 90]",
            req.lat
        )));
    }
    if !req.lon.is_finite() || !(-180.0..=180.0).contains(&req.lon) {
        return Err(FetchError::InvalidParameters(format!(
            "longitude {} outside [-180, 180]",
            req.lon
        )));
    }
    if !req.deg_window.is_finite() || req.deg_window < 0.0 {
        return Err(FetchError::InvalidParameters(format!(
            "degree window {} must be a non-negative number",
            req.deg_window
        )));
    }
    Ok(())
}

/// [min_lon, min_lat, max_lon, max_lat], clamped to valid ranges. No
/// antimeridian wrapping; a box near the date line simply gets cut off.
pub fn bounding_box(lat: f64, lon: f64, deg: f64) -> [f64; 4] {
    [
        (lon - deg).max(-180.0),
        (lat - deg).max(-90.0),
        (lon + deg).min(180.0),
        (lat + deg).min(90.0),
    ]
}

/// Inclusive "start/end" interval covering whole days on both ends.
pub fn datetime_range(date: NaiveDate, day_window: u32) -> String {
    let days = Days::new(day_window as u64);
    let start = date.checked_sub_days(days).unwrap_or(NaiveDate::MIN);
    let end = date.checked_add_days(days).unwrap_or(NaiveDate::MAX);
    format!(
        "{}T00:00:00Z/{}T23:59:59Z",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

/// Pick the item whose acquisition time is closest to `center`; equal
/// distances fall back to the lexicographically smaller id so the choice is
/// stable across runs. Items without a parseable datetime are skipped. The
/// catalog's own ordering is not trusted.
pub fn select_nearest(
    items: &[StacItem],
    center: DateTime<Utc>,
) -> Option<(&StacItem, DateTime<Utc>)> {
    items
        .iter()
        .filter_map(|item| {
            let raw = item.properties.datetime.as_deref()?;
            let t = DateTime::parse_from_rfc3339(raw).ok()?.with_timezone(&Utc);
            Some((item, t))
        })
        .min_by(|(a, ta), (b, tb)| {
            let da = (*ta - center).abs();
            let db = (*tb - center).abs();
            da.cmp(&db).then_with(|| a.id.cmp(&b.id))
        })
}

/// earth-search hands out `s3://bucket/key` hrefs; rewrite them to the
/// bucket's public HTTPS endpoint. Anything else passes through untouched.
pub fn s3_to_http(href: &str) -> String {
    match href.strip_prefix("s3://").and_then(|rest| rest.split_once('/')) {
        Some((bucket, key)) => format!("https://{bucket}.s3.amazonaws.com/{key}"),
        None => href.to_string(),
    }
}
