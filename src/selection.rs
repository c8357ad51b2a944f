//! Selected / hovered temple tracking
//!
//! At most one feature carries `selected = true`. Hover is tracked
//! independently and also limited to one feature.

use std::time::Duration;

use crate::config::SelectionConfig;
use crate::dataset::{Temple, TempleId};
use crate::map::{CameraOptions, FeatureFlag, LngLat, MapHost};

/// Current selection: record id plus its position in the renderable list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub id: TempleId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Selected(Selection),
    Cleared(Selection),
}

pub struct SelectionController {
    source: String,
    config: SelectionConfig,
    selected: Option<Selection>,
    hovered: Option<TempleId>,
    instant_camera: bool,
}

impl SelectionController {
    pub fn new(source: &str, config: SelectionConfig) -> Self {
        Self {
            source: source.to_string(),
            config,
            selected: None,
            hovered: None,
            instant_camera: false,
        }
    }

    pub fn selected(&self) -> Option<Selection> {
        self.selected
    }

    pub fn hovered(&self) -> Option<TempleId> {
        self.hovered
    }

    /// Reduced motion: camera jumps instead of flying
    pub fn set_instant_camera(&mut self, instant: bool) {
        self.instant_camera = instant;
    }

    /// Select `temple` at `index`, re-centering the camera even when it
    /// is already selected
    pub fn select(&mut self, host: &mut impl MapHost, temple: &Temple, index: usize) -> SelectionChange {
        let next = Selection { id: temple.id, index };

        match self.selected {
            Some(prev) if prev.id == temple.id => {
                tracing::debug!("Temple {} already selected, re-centering", temple.id);
            }
            Some(prev) => {
                host.set_feature_flag(&self.source, prev.id, FeatureFlag::Selected, false);
                host.set_feature_flag(&self.source, temple.id, FeatureFlag::Selected, true);
            }
            None => {
                host.set_feature_flag(&self.source, temple.id, FeatureFlag::Selected, true);
            }
        }
        self.selected = Some(next);
        tracing::info!("Selected '{}' (id={}, index={})", temple.name, temple.id, index);

        let c = temple.location.coordinates;
        let duration = if self.instant_camera {
            Duration::ZERO
        } else {
            Duration::from_millis(self.config.fly_to_duration_ms)
        };
        host.fly_to(CameraOptions {
            center: Some(LngLat::new(c.lng, c.lat)),
            zoom: Some(self.config.fly_to_zoom),
            duration,
        });

        SelectionChange::Selected(next)
    }

    /// Drop the selection; `None` when nothing was selected
    pub fn clear(&mut self, host: &mut impl MapHost) -> Option<SelectionChange> {
        let prev = self.selected.take()?;
        host.set_feature_flag(&self.source, prev.id, FeatureFlag::Selected, false);
        tracing::info!("Cleared selection of temple {}", prev.id);
        Some(SelectionChange::Cleared(prev))
    }

    /// Click on map background
    pub fn click_empty(&mut self, host: &mut impl MapHost) -> Option<SelectionChange> {
        if self.selected.is_none() {
            return None;
        }
        self.clear(host)
    }

    /// Pointer now over `id`, or over nothing
    pub fn hover(&mut self, host: &mut impl MapHost, id: Option<TempleId>) {
        if self.hovered == id {
            return;
        }
        if let Some(prev) = self.hovered {
            host.set_feature_flag(&self.source, prev, FeatureFlag::Hovered, false);
        }
        if let Some(next) = id {
            host.set_feature_flag(&self.source, next, FeatureFlag::Hovered, true);
        }
        self.hovered = id;
    }
}
