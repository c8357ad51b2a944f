//! Top-level view state
//!
//! Owns the renderable temples and every controller, and routes map events
//! and key presses to them. All mutation happens on the UI thread, one
//! event at a time.

use std::time::Duration;

use crate::accessibility::Presentation;
use crate::carousel::Carousel;
use crate::config::{CarouselConfig, Config, SelectionConfig};
use crate::dataset::{Temple, TempleId};
use crate::detail::{DetailCommand, DetailView, NavKey};
use crate::map::layer::{CircleLayer, CirclePaint, Fog};
use crate::map::{
    CameraOptions, LngLat, MapEvent, MapHost, PointFeature, TEMPLE_LAYER, TEMPLE_SOURCE,
};
use crate::rotation::RotationController;
use crate::selection::{SelectionChange, SelectionController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Waiting for the map's load event
    Loading,
    Running,
    /// Host released; every later call is a no-op
    TornDown,
}

pub struct Viewer {
    temples: Vec<Temple>,
    lifecycle: Lifecycle,
    rotation: RotationController,
    selection: SelectionController,
    detail: DetailView,
    carousel: Option<Carousel>,
    carousel_config: CarouselConfig,
    selection_config: SelectionConfig,
    spin_configured: bool,
    fog: Fog,
    reduced_motion: bool,
}

impl Viewer {
    /// `temples` must already exclude records without a location
    pub fn new(temples: Vec<Temple>, config: &Config) -> Self {
        tracing::info!("Viewer created with {} renderable temples", temples.len());
        Self {
            temples,
            lifecycle: Lifecycle::Loading,
            rotation: RotationController::new(config.spin.clone()),
            selection: SelectionController::new(TEMPLE_SOURCE, config.selection.clone()),
            detail: DetailView::new(config.detail.edge_policy),
            carousel: None,
            carousel_config: config.carousel.clone(),
            selection_config: config.selection.clone(),
            spin_configured: config.spin.enabled,
            fog: Fog::from(&config.fog),
            reduced_motion: false,
        }
    }

    #[cfg(test)]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn temples(&self) -> &[Temple] {
        &self.temples
    }

    pub fn detail(&self) -> &DetailView {
        &self.detail
    }

    #[cfg(test)]
    pub fn rotation(&self) -> &RotationController {
        &self.rotation
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    /// Record shown in the detail view
    pub fn current_temple(&self) -> Option<&Temple> {
        self.detail.current().and_then(|i| self.temples.get(i))
    }

    pub fn carousel(&self) -> Option<&Carousel> {
        self.carousel.as_ref()
    }

    pub fn carousel_mut(&mut self) -> Option<&mut Carousel> {
        self.carousel.as_mut()
    }

    pub fn index_of(&self, id: TempleId) -> Option<usize> {
        self.temples.iter().position(|t| t.id == id)
    }

    /// Register the point source, circle layer and fog; starts the spin
    pub fn on_load(&mut self, host: &mut impl MapHost) {
        if self.lifecycle != Lifecycle::Loading {
            return;
        }
        let features = self
            .temples
            .iter()
            .map(|t| PointFeature {
                id: t.id,
                position: LngLat::new(t.location.coordinates.lng, t.location.coordinates.lat),
                status: t.status,
            })
            .collect();
        host.add_point_source(TEMPLE_SOURCE, features);
        host.add_circle_layer(CircleLayer {
            id: TEMPLE_LAYER.to_string(),
            source: TEMPLE_SOURCE.to_string(),
            paint: CirclePaint::default(),
        });
        host.set_fog(self.fog);

        self.lifecycle = Lifecycle::Running;
        tracing::info!("Map loaded, {} temple markers registered", self.temples.len());
        self.rotation.tick(host);
    }

    pub fn handle_event(&mut self, host: &mut impl MapHost, event: MapEvent) -> Option<SelectionChange> {
        if event == MapEvent::Load {
            self.on_load(host);
            return None;
        }
        if self.lifecycle != Lifecycle::Running {
            return None;
        }

        match event {
            MapEvent::Load => None,
            MapEvent::PointerDown => {
                self.rotation.pointer_down();
                None
            }
            MapEvent::PointerUp | MapEvent::TouchEnd => {
                self.rotation.pointer_up(host);
                None
            }
            MapEvent::DoubleClick { .. } => {
                let duration = self.camera_duration(self.selection_config.double_click_duration_ms);
                let zoom = host.zoom() + self.selection_config.double_click_zoom_step;
                host.ease_to(CameraOptions::zoom(zoom, duration));
                None
            }
            MapEvent::Click { pos } => {
                let hit = host.query_rendered_features(pos, TEMPLE_LAYER).first().copied();
                match hit.and_then(|id| self.index_of(id)) {
                    Some(index) => self.select_index(host, index),
                    None => self.click_empty(host),
                }
            }
            MapEvent::PointerMove { pos } => {
                let hit = host.query_rendered_features(pos, TEMPLE_LAYER).first().copied();
                self.selection.hover(host, hit);
                None
            }
            MapEvent::PointerLeave => {
                self.selection.hover(host, None);
                None
            }
        }
    }

    /// Select the record at `index` and open it in the detail view
    pub fn select_index(&mut self, host: &mut impl MapHost, index: usize) -> Option<SelectionChange> {
        if self.lifecycle != Lifecycle::Running {
            return None;
        }
        let temple = self.temples.get(index)?;
        let same = self.selection.selected().is_some_and(|s| s.id == temple.id);
        let change = self.selection.select(host, temple, index);

        if !same || self.carousel.is_none() {
            self.carousel = Some(Carousel::for_temple(temple, &self.carousel_config));
        }
        self.detail.open(index);
        Some(change)
    }

    /// Close button, Escape and the back key
    pub fn close_detail(&mut self, host: &mut impl MapHost) -> Option<SelectionChange> {
        if self.lifecycle != Lifecycle::Running {
            return None;
        }
        self.detail.close();
        self.carousel = None;
        self.selection.clear(host)
    }

    fn click_empty(&mut self, host: &mut impl MapHost) -> Option<SelectionChange> {
        let change = self.selection.click_empty(host)?;
        self.detail.close();
        self.carousel = None;
        Some(change)
    }

    pub fn handle_key(&mut self, host: &mut impl MapHost, key: NavKey) -> Option<SelectionChange> {
        if self.lifecycle != Lifecycle::Running {
            return None;
        }
        match self.detail.command_for(key, self.temples.len()) {
            DetailCommand::Close => self.close_detail(host),
            DetailCommand::Show(index) => self.select_index(host, index),
            DetailCommand::Ignore => None,
        }
    }

    /// Enter/Space on the hovered marker while no detail view is open
    pub fn activate_hovered(&mut self, host: &mut impl MapHost) -> Option<SelectionChange> {
        if self.lifecycle != Lifecycle::Running || self.detail.current().is_some() {
            return None;
        }
        let index = self.selection.hovered().and_then(|id| self.index_of(id))?;
        self.select_index(host, index)
    }

    /// One animation frame
    pub fn tick(&mut self, host: &mut impl MapHost, dt: Duration) {
        if self.lifecycle != Lifecycle::Running {
            return;
        }
        self.rotation.tick(host);
        if let Some(carousel) = self.carousel.as_mut() {
            carousel.tick(dt);
        }
    }

    pub fn apply_presentation(&mut self, presentation: Presentation) {
        self.reduced_motion = !presentation.animations;
        self.rotation.set_enabled(self.spin_configured && presentation.animations);
        self.selection.set_instant_camera(self.reduced_motion);
    }

    /// Stop the loop and release the host; idempotent
    pub fn teardown(&mut self, host: &mut impl MapHost) {
        if self.lifecycle == Lifecycle::TornDown {
            return;
        }
        tracing::info!("Tearing down viewer");
        self.lifecycle = Lifecycle::TornDown;
        self.detail.close();
        self.carousel = None;
        host.remove();
    }

    fn camera_duration(&self, ms: u64) -> Duration {
        if self.reduced_motion {
            Duration::ZERO
        } else {
            Duration::from_millis(ms)
        }
    }
}
