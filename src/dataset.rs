//! Temple dataset - bundled point-of-interest records
//!
//! The dataset is read-only while the viewer runs. Only the `geocode`
//! command rewrites a dataset file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Dataset compiled into the binary
const BUNDLED_TEMPLES: &str = include_str!("../data/temples.json");

pub type TempleId = u32;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid dataset JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Temple not found: {0}")]
    UnknownTemple(TempleId),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub country: String,
    pub coordinates: Coordinates,
}

impl Location {
    /// State, else region, else province
    pub fn subdivision(&self) -> Option<&str> {
        self.state
            .as_deref()
            .or(self.region.as_deref())
            .or(self.province.as_deref())
    }
}

/// Lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Operating,
    #[serde(rename = "Under Construction")]
    UnderConstruction,
    Announced,
    #[serde(rename = "Closed for Renovation")]
    ClosedForRenovation,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Operating,
        Status::UnderConstruction,
        Status::Announced,
        Status::ClosedForRenovation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Status::Operating => "Operating",
            Status::UnderConstruction => "Under Construction",
            Status::Announced => "Announced",
            Status::ClosedForRenovation => "Closed for Renovation",
        }
    }

    pub fn is_operating(&self) -> bool {
        matches!(self, Status::Operating)
    }

    /// Parse a label case-insensitively, also accepting kebab-case
    pub fn from_label(label: &str) -> Option<Status> {
        let wanted = label.trim().to_lowercase().replace('-', " ");
        Status::ALL.into_iter().find(|s| s.label().to_lowercase() == wanted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Images {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panoramic360_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_floor_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_seating_rooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_ordinance_rooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_center: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patron_housing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cafeteria: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clothing: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenDateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundbreaking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_open_house: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rededication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renovation: Option<OpenDateRange>,
}

/// A single point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Temple {
    pub id: TempleId,
    pub name: String,
    pub location: Location,
    pub address: String,
    #[serde(default)]
    pub dedication_date: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Images>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<History>,
}

impl Temple {
    /// (0, 0) marks a record that was never geocoded
    pub fn has_location(&self) -> bool {
        let c = self.location.coordinates;
        !(c.lat == 0.0 && c.lng == 0.0)
    }

    /// "City, Subdivision" or just the city
    pub fn place_label(&self) -> String {
        match self.location.subdivision() {
            Some(sub) => format!("{}, {}", self.location.city, sub),
            None => self.location.city.clone(),
        }
    }
}

/// Ordered collection of temples
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    temples: Vec<Temple>,
}

impl Dataset {
    #[cfg(test)]
    pub fn new(temples: Vec<Temple>) -> Self {
        Self { temples }
    }

    /// Dataset compiled into the binary
    pub fn bundled() -> Result<Self, DatasetError> {
        Self::from_json(BUNDLED_TEMPLES)
    }

    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let temples: Vec<Temple> = serde_json::from_str(json)?;
        Ok(Self { temples })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        tracing::debug!("Loading dataset from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let dataset = Self::from_json(&content)?;
        tracing::info!("Loaded {} temples from {:?}", dataset.len(), path);
        Ok(dataset)
    }

    /// Load `path` when given, otherwise the bundled dataset
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, DatasetError> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let dataset = Self::bundled()?;
                tracing::info!("Using bundled dataset ({} temples)", dataset.len());
                Ok(dataset)
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        let json = serde_json::to_string_pretty(&self.temples)?;
        std::fs::write(path.as_ref(), json)?;
        tracing::info!("Saved {} temples to {:?}", self.temples.len(), path.as_ref());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.temples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temples.is_empty()
    }

    pub fn temples(&self) -> &[Temple] {
        &self.temples
    }

    pub fn temples_mut(&mut self) -> &mut [Temple] {
        &mut self.temples
    }

    pub fn get(&self, id: TempleId) -> Result<&Temple, DatasetError> {
        self.temples
            .iter()
            .find(|t| t.id == id)
            .ok_or(DatasetError::UnknownTemple(id))
    }

    /// Temples that can be drawn on the globe, in dataset order
    pub fn renderable(&self) -> Vec<Temple> {
        self.temples.iter().filter(|t| t.has_location()).cloned().collect()
    }

    /// Temples still waiting for coordinates
    pub fn missing_coordinates(&self) -> Vec<&Temple> {
        self.temples.iter().filter(|t| !t.has_location()).collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_temple(id: TempleId, name: &str, lat: f64, lng: f64) -> Temple {
    Temple {
        id,
        name: name.to_string(),
        location: Location {
            city: "Somewhere".to_string(),
            state: None,
            region: None,
            province: None,
            country: "Nowhere".to_string(),
            coordinates: Coordinates { lat, lng },
        },
        address: format!("{} Main St", id),
        dedication_date: None,
        status: Status::Operating,
        images: None,
        media: None,
        details: None,
        history: None,
    }
}
