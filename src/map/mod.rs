//! Map host - camera, feature state, hit-testing and globe rendering
//!
//! Controllers talk to the map only through [`MapHost`], which keeps them
//! independent of the egui-backed [`globe::GlobeMap`].

pub mod borders;
pub mod globe;
pub mod layer;

use egui::Pos2;
use std::time::Duration;

use crate::dataset::{Status, TempleId};
use layer::{CircleLayer, Fog};

/// Point source holding every renderable temple
pub const TEMPLE_SOURCE: &str = "temples";
/// Circle layer drawing [`TEMPLE_SOURCE`]
pub const TEMPLE_LAYER: &str = "temple-points";

/// Longitude/latitude in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Target of a camera transition; `None` keeps the current value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraOptions {
    pub center: Option<LngLat>,
    pub zoom: Option<f64>,
    pub duration: Duration,
}

impl CameraOptions {
    pub fn center(center: LngLat, duration: Duration) -> Self {
        Self { center: Some(center), zoom: None, duration }
    }

    pub fn zoom(zoom: f64, duration: Duration) -> Self {
        Self { center: None, zoom: Some(zoom), duration }
    }
}

/// Transient highlight flags of one feature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureState {
    pub hovered: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFlag {
    Hovered,
    Selected,
}

impl FeatureState {
    pub fn set(&mut self, flag: FeatureFlag, value: bool) {
        match flag {
            FeatureFlag::Hovered => self.hovered = value,
            FeatureFlag::Selected => self.selected = value,
        }
    }
}

/// One renderable point
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub id: TempleId,
    pub position: LngLat,
    pub status: Status,
}

/// Input delivered by the map host to the viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// Style and sources are ready; fired once
    Load,
    PointerDown,
    PointerUp,
    TouchEnd,
    DoubleClick { pos: Pos2 },
    Click { pos: Pos2 },
    PointerMove { pos: Pos2 },
    PointerLeave,
}

/// The map engine consumed by the rotation and selection controllers
pub trait MapHost {
    fn center(&self) -> LngLat;
    fn zoom(&self) -> f64;
    /// A fly-to transition is running
    fn is_flying(&self) -> bool;
    /// Short transition with linear easing
    fn ease_to(&mut self, camera: CameraOptions);
    /// Long transition with ease-in-out
    fn fly_to(&mut self, camera: CameraOptions);
    fn set_feature_flag(&mut self, source: &str, id: TempleId, flag: FeatureFlag, value: bool);
    fn feature_state(&self, source: &str, id: TempleId) -> FeatureState;
    /// Feature ids of `layer` under a screen point, nearest first
    fn query_rendered_features(&self, point: Pos2, layer: &str) -> Vec<TempleId>;
    fn add_point_source(&mut self, name: &str, features: Vec<PointFeature>);
    fn add_circle_layer(&mut self, layer: CircleLayer);
    fn set_fog(&mut self, fog: Fog);
    /// Release the map; later calls are ignored
    fn remove(&mut self);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording map host for controller tests

    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum CameraCall {
        Ease(CameraOptions),
        Fly(CameraOptions),
    }

    #[derive(Default)]
    pub struct RecordingHost {
        pub center: Option<LngLat>,
        pub zoom: f64,
        pub flying: bool,
        pub camera_calls: Vec<CameraCall>,
        pub states: HashMap<(String, TempleId), FeatureState>,
        pub flag_writes: usize,
        /// Screen positions returned by hit-testing
        pub hit_regions: Vec<(Pos2, TempleId)>,
        pub sources: HashMap<String, Vec<PointFeature>>,
        pub layers: Vec<CircleLayer>,
        pub fog: Option<Fog>,
        pub removed: bool,
    }

    impl RecordingHost {
        pub fn at_zoom(zoom: f64) -> Self {
            Self { zoom, center: Some(LngLat::new(0.0, 20.0)), ..Default::default() }
        }

        pub fn selected_ids(&self) -> Vec<TempleId> {
            let mut ids: Vec<TempleId> = self
                .states
                .iter()
                .filter(|(_, s)| s.selected)
                .map(|((_, id), _)| *id)
                .collect();
            ids.sort_unstable();
            ids
        }

        pub fn hovered_ids(&self) -> Vec<TempleId> {
            let mut ids: Vec<TempleId> = self
                .states
                .iter()
                .filter(|(_, s)| s.hovered)
                .map(|((_, id), _)| *id)
                .collect();
            ids.sort_unstable();
            ids
        }

        pub fn fly_calls(&self) -> Vec<CameraOptions> {
            self.camera_calls
                .iter()
                .filter_map(|c| match c {
                    CameraCall::Fly(opts) => Some(*opts),
                    _ => None,
                })
                .collect()
        }

        pub fn ease_calls(&self) -> Vec<CameraOptions> {
            self.camera_calls
                .iter()
                .filter_map(|c| match c {
                    CameraCall::Ease(opts) => Some(*opts),
                    _ => None,
                })
                .collect()
        }

        fn apply(&mut self, camera: &CameraOptions) {
            if let Some(center) = camera.center {
                self.center = Some(center);
            }
            if let Some(zoom) = camera.zoom {
                self.zoom = zoom;
            }
        }
    }

    impl MapHost for RecordingHost {
        fn center(&self) -> LngLat {
            self.center.unwrap_or(LngLat::new(0.0, 0.0))
        }

        fn zoom(&self) -> f64 {
            self.zoom
        }

        fn is_flying(&self) -> bool {
            self.flying
        }

        fn ease_to(&mut self, camera: CameraOptions) {
            self.camera_calls.push(CameraCall::Ease(camera));
            self.apply(&camera);
        }

        fn fly_to(&mut self, camera: CameraOptions) {
            self.camera_calls.push(CameraCall::Fly(camera));
            self.apply(&camera);
        }

        fn set_feature_flag(&mut self, source: &str, id: TempleId, flag: FeatureFlag, value: bool) {
            self.flag_writes += 1;
            self.states.entry((source.to_string(), id)).or_default().set(flag, value);
        }

        fn feature_state(&self, source: &str, id: TempleId) -> FeatureState {
            self.states.get(&(source.to_string(), id)).copied().unwrap_or_default()
        }

        fn query_rendered_features(&self, point: Pos2, _layer: &str) -> Vec<TempleId> {
            self.hit_regions
                .iter()
                .filter(|(pos, _)| pos.distance(point) <= 5.0)
                .map(|(_, id)| *id)
                .collect()
        }

        fn add_point_source(&mut self, name: &str, features: Vec<PointFeature>) {
            self.sources.insert(name.to_string(), features);
        }

        fn add_circle_layer(&mut self, layer: CircleLayer) {
            self.layers.push(layer);
        }

        fn set_fog(&mut self, fog: Fog) {
            self.fog = Some(fog);
        }

        fn remove(&mut self) {
            self.removed = true;
        }
    }
}
