//! Fill in missing temple coordinates through a Nominatim geocoder

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::dataset::{Coordinates, Dataset, DatasetError, TempleId};

/// Nominatim asks for at most one request per second
pub const RATE_LIMIT: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Names listed by the missing-coordinates report
const REPORT_PREVIEW: usize = 10;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Geocoder returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Unexpected geocoder response: {0}")]
    BadResponse(String),
    #[error("No coordinates found for '{0}'")]
    NotFound(String),
}

/// One search hit; Nominatim encodes numbers as strings
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Address to coordinates lookup
pub trait Geocode {
    async fn lookup(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

pub struct NominatimClient {
    client: reqwest::Client,
    search_url: String,
}

impl NominatimClient {
    pub fn new(search_url: &str, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, search_url: search_url.to_string() })
    }
}

impl Geocode for NominatimClient {
    async fn lookup(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let url = format!(
            "{}?q={}&format=json&limit=1",
            self.search_url,
            urlencoding::encode(address)
        );
        tracing::debug!("Geocoding: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }
        let body = response.text().await?;
        parse_search_response(&body, address)
    }
}

/// First hit of a `format=json` search response
pub fn parse_search_response(body: &str, address: &str) -> Result<Coordinates, GeocodeError> {
    let places: Vec<Place> = serde_json::from_str(body).map_err(|e| GeocodeError::BadResponse(e.to_string()))?;
    let place = places.first().ok_or_else(|| GeocodeError::NotFound(address.to_string()))?;

    let lat: f64 = place
        .lat
        .trim()
        .parse()
        .map_err(|_| GeocodeError::BadResponse(format!("bad latitude '{}'", place.lat)))?;
    let lng: f64 = place
        .lon
        .trim()
        .parse()
        .map_err(|_| GeocodeError::BadResponse(format!("bad longitude '{}'", place.lon)))?;

    // (0, 0) is the "not geocoded" marker and would hide the temple
    if lat == 0.0 && lng == 0.0 {
        return Err(GeocodeError::NotFound(address.to_string()));
    }
    Ok(Coordinates { lat, lng })
}

/// Summary of records still sitting at (0, 0)
pub struct MissingReport {
    pub total: usize,
    /// (name, address) in dataset order
    pub missing: Vec<(String, String)>,
}

impl MissingReport {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            total: dataset.len(),
            missing: dataset
                .missing_coordinates()
                .into_iter()
                .map(|t| (t.name.clone(), t.address.clone()))
                .collect(),
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.missing.len() as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for MissingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total temples: {}", self.total)?;
        writeln!(f, "Temples with missing coordinates: {}", self.missing.len())?;
        writeln!(f, "Percentage missing: {:.1}%", self.percentage())?;
        if self.missing.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "Temples with missing coordinates:")?;
        for (name, address) in self.missing.iter().take(REPORT_PREVIEW) {
            writeln!(f, "  - {}: {}", name, address)?;
        }
        if self.missing.len() > REPORT_PREVIEW {
            writeln!(f, "  ... and {} more", self.missing.len() - REPORT_PREVIEW)?;
        }
        Ok(())
    }
}

/// `name -> corrected address`, read from YAML
pub fn load_address_overrides(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    let overrides: BTreeMap<String, String> = serde_yaml::from_str(&content)?;
    tracing::info!("Loaded {} address overrides from {:?}", overrides.len(), path);
    Ok(overrides)
}

/// Replace addresses by temple name; returns the ids that were matched
pub fn apply_address_overrides(dataset: &mut Dataset, overrides: &BTreeMap<String, String>) -> Vec<TempleId> {
    let mut ids = Vec::new();
    for (name, address) in overrides {
        match dataset.temples_mut().iter_mut().find(|t| &t.name == name) {
            Some(temple) => {
                tracing::debug!("Address of '{}': '{}' -> '{}'", name, temple.address, address);
                temple.address = address.clone();
                ids.push(temple.id);
            }
            None => tracing::warn!("Address override for unknown temple '{}'", name),
        }
    }
    ids
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub dry_run: bool,
    pub limit: Option<usize>,
    /// Pause between requests
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { dry_run: false, limit: None, delay: RATE_LIMIT }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub updated: Vec<TempleId>,
    pub failed: Vec<TempleId>,
}

/// Geocode `targets` in order, writing found coordinates into `dataset`
pub async fn geocode_batch(
    geocoder: &impl Geocode,
    dataset: &mut Dataset,
    targets: &[TempleId],
    options: &BatchOptions,
) -> BatchOutcome {
    let targets: Vec<TempleId> = match options.limit {
        Some(limit) => targets.iter().copied().take(limit).collect(),
        None => targets.to_vec(),
    };
    let mut outcome = BatchOutcome::default();
    println!("Processing {} temples...", targets.len());

    for (i, id) in targets.iter().enumerate() {
        let Some(temple) = dataset.temples_mut().iter_mut().find(|t| t.id == *id) else {
            tracing::warn!("Temple {} vanished from the dataset", id);
            continue;
        };
        println!();
        println!("[{}/{}] {}", i + 1, targets.len(), temple.name);
        println!("  Address: {}", temple.address);

        if options.dry_run {
            println!("  (dry run, not updating)");
            continue;
        }

        outcome.attempted += 1;
        match geocoder.lookup(&temple.address).await {
            Ok(coordinates) => {
                println!("  [OK] {:.6}, {:.6}", coordinates.lat, coordinates.lng);
                temple.location.coordinates = coordinates;
                outcome.updated.push(*id);
            }
            Err(e) => {
                println!("  [FAIL] {}", e);
                tracing::warn!("Geocoding '{}' failed: {}", temple.name, e);
                outcome.failed.push(*id);
            }
        }

        if i + 1 < targets.len() && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    outcome
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

/// Copy the current file to `<path>.backup`, then write `dataset`
pub fn save_with_backup(dataset: &Dataset, path: &Path) -> Result<PathBuf, DatasetError> {
    let backup = backup_path(path);
    if path.exists() {
        std::fs::copy(path, &backup)?;
        tracing::info!("Saved backup to {:?}", backup);
    }
    dataset.save(path)?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sample_temple;
    use std::collections::HashMap;

    struct FixedGeocoder {
        answers: HashMap<String, Coordinates>,
    }

    impl Geocode for FixedGeocoder {
        async fn lookup(&self, address: &str) -> Result<Coordinates, GeocodeError> {
            self.answers
                .get(address)
                .copied()
                .ok_or_else(|| GeocodeError::NotFound(address.to_string()))
        }
    }

    fn missing_dataset() -> Dataset {
        Dataset::new(vec![
            sample_temple(1, "Placed", 40.0, -111.0),
            sample_temple(2, "Lost One", 0.0, 0.0),
            sample_temple(3, "Lost Two", 0.0, 0.0),
        ])
    }

    fn no_delay() -> BatchOptions {
        BatchOptions { delay: Duration::ZERO, ..BatchOptions::default() }
    }

    #[test]
    fn test_parse_string_coordinates() {
        let body = r#"[{"place_id": 1, "lat": "40.7707", "lon": "-111.8919", "display_name": "x"}]"#;
        let c = parse_search_response(body, "somewhere").unwrap();
        assert_eq!(c.lat, 40.7707);
        assert_eq!(c.lng, -111.8919);
    }

    #[test]
    fn test_parse_empty_result_is_not_found() {
        assert!(matches!(parse_search_response("[]", "nowhere"), Err(GeocodeError::NotFound(a)) if a == "nowhere"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(parse_search_response("{}", "a"), Err(GeocodeError::BadResponse(_))));
        let bad = r#"[{"lat": "north", "lon": "1.0"}]"#;
        assert!(matches!(parse_search_response(bad, "a"), Err(GeocodeError::BadResponse(_))));
    }

    #[test]
    fn test_missing_report_counts() {
        let report = MissingReport::from_dataset(&missing_dataset());
        assert_eq!(report.total, 3);
        assert_eq!(report.missing.len(), 2);
        assert!((report.percentage() - 66.666).abs() < 0.01);

        let text = report.to_string();
        assert!(text.contains("Percentage missing: 66.7%"));
        assert!(text.contains("  - Lost One: 2 Main St"));
        assert!(!text.contains("more"));
    }

    #[test]
    fn test_missing_report_truncates_list() {
        let temples = (1..=13).map(|i| sample_temple(i, &format!("T{i}"), 0.0, 0.0)).collect();
        let text = MissingReport::from_dataset(&Dataset::new(temples)).to_string();
        assert!(text.contains("  - T10:"));
        assert!(!text.contains("  - T11:"));
        assert!(text.contains("... and 3 more"));
    }

    #[tokio::test]
    async fn test_batch_updates_found_and_keeps_failed() {
        let mut dataset = missing_dataset();
        let geocoder = FixedGeocoder {
            answers: HashMap::from([("2 Main St".to_string(), Coordinates { lat: 5.1, lng: -4.0 })]),
        };

        let outcome = geocode_batch(&geocoder, &mut dataset, &[2, 3], &no_delay()).await;

        assert_eq!(outcome, BatchOutcome { attempted: 2, updated: vec![2], failed: vec![3] });
        assert_eq!(dataset.get(2).unwrap().location.coordinates.lat, 5.1);
        assert!(!dataset.get(3).unwrap().has_location());
        assert_eq!(dataset.renderable().len(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_and_limit() {
        let mut dataset = missing_dataset();
        let geocoder = FixedGeocoder { answers: HashMap::new() };

        let dry = BatchOptions { dry_run: true, ..no_delay() };
        let outcome = geocode_batch(&geocoder, &mut dataset, &[2, 3], &dry).await;
        assert_eq!(outcome.attempted, 0);

        let limited = BatchOptions { limit: Some(1), ..no_delay() };
        let outcome = geocode_batch(&geocoder, &mut dataset, &[2, 3], &limited).await;
        assert_eq!(outcome.failed, vec![2]);
    }

    #[test]
    fn test_address_overrides_match_by_name() {
        let mut dataset = missing_dataset();
        let overrides = BTreeMap::from([
            ("Lost Two".to_string(), "Pesega, Apia, Samoa".to_string()),
            ("Unknown".to_string(), "x".to_string()),
        ]);

        let ids = apply_address_overrides(&mut dataset, &overrides);

        assert_eq!(ids, vec![3]);
        assert_eq!(dataset.get(3).unwrap().address, "Pesega, Apia, Samoa");
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(backup_path(Path::new("data/temples.json")), PathBuf::from("data/temples.json.backup"));
    }
}
