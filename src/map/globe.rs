//! Native globe map: orthographic projection, camera transitions,
//! feature state and hit-testing, drawn with an egui painter.

use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2};
use std::collections::HashMap;

use super::layer::{CircleLayer, Fog};
use super::{CameraOptions, FeatureFlag, FeatureState, LngLat, MapHost, PointFeature};
use crate::config::MapConfig;
use crate::dataset::TempleId;

/// World circumference in pixels at zoom 0
const WORLD_SIZE: f64 = 256.0;

/// Latitude limit for panning, in degrees
const MAX_LATITUDE: f64 = 85.0;

/// Transitions at most this long (seconds) do not count as "moving"
const SINGLE_FRAME: f64 = 0.05;

/// Extra pixels around a circle that still count as a hit
const HIT_SLOP: f32 = 3.0;

/// Zoom change per pixel of scroll
const SCROLL_ZOOM_RATE: f64 = 0.002;

const GRATICULE_STEP: f64 = 30.0;
const STAR_COUNT: u32 = 240;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    EaseInOutCubic,
}

impl Easing {
    fn apply(self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Camera {
    center: LngLat,
    zoom: f64,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    from: Camera,
    to: Camera,
    start: f64,
    duration: f64,
    easing: Easing,
}

impl Transition {
    fn sample(&self, now: f64) -> (Camera, bool) {
        let t = ((now - self.start) / self.duration).clamp(0.0, 1.0);
        let k = self.easing.apply(t);
        let d_lng = shortest_lng_delta(self.from.center.lng, self.to.center.lng);
        let camera = Camera {
            center: LngLat::new(
                normalize_lng(self.from.center.lng + d_lng * k),
                self.from.center.lat + (self.to.center.lat - self.from.center.lat) * k,
            ),
            zoom: self.from.zoom + (self.to.zoom - self.from.zoom) * k,
        };
        (camera, t >= 1.0)
    }
}

/// Camera start and zoom limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapOptions {
    pub center: LngLat,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl From<&MapConfig> for MapOptions {
    fn from(cfg: &MapConfig) -> Self {
        Self {
            center: LngLat::new(cfg.center[0], cfg.center[1]),
            zoom: cfg.initial_zoom,
            min_zoom: cfg.min_zoom,
            max_zoom: cfg.max_zoom,
        }
    }
}

pub struct GlobeMap {
    options: MapOptions,
    camera: Camera,
    transition: Option<Transition>,
    /// Seconds, supplied by the frame loop
    clock: f64,
    viewport: Rect,
    sources: HashMap<String, Vec<PointFeature>>,
    layers: Vec<CircleLayer>,
    feature_states: HashMap<(String, TempleId), FeatureState>,
    fog: Option<Fog>,
    borders: Vec<Vec<LngLat>>,
    removed: bool,
}

impl GlobeMap {
    pub fn new(options: MapOptions) -> Self {
        let zoom = options.zoom.clamp(options.min_zoom, options.max_zoom);
        Self {
            options,
            camera: Camera { center: options.center, zoom },
            transition: None,
            clock: 0.0,
            viewport: Rect::from_min_size(Pos2::ZERO, Vec2::new(1200.0, 800.0)),
            sources: HashMap::new(),
            layers: Vec::new(),
            feature_states: HashMap::new(),
            fog: None,
            borders: Vec::new(),
            removed: false,
        }
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    pub fn set_borders(&mut self, borders: Vec<Vec<LngLat>>) {
        self.borders = borders;
    }

    #[cfg(test)]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Step the running transition to `now` (seconds)
    pub fn advance(&mut self, now: f64) {
        self.clock = now;
        if let Some(transition) = self.transition {
            let (camera, done) = transition.sample(now);
            self.camera = camera;
            if done {
                self.transition = None;
            }
        }
    }

    /// Globe radius in pixels
    pub fn radius(&self) -> f64 {
        WORLD_SIZE * 2f64.powf(self.camera.zoom) / std::f64::consts::TAU
    }

    /// Orthographic projection; `None` on the far hemisphere
    pub fn project(&self, p: LngLat) -> Option<Pos2> {
        let (lat0, lng0) = (self.camera.center.lat.to_radians(), self.camera.center.lng.to_radians());
        let (lat, lng) = (p.lat.to_radians(), p.lng.to_radians());
        let d_lng = lng - lng0;

        let cos_c = lat0.sin() * lat.sin() + lat0.cos() * lat.cos() * d_lng.cos();
        if cos_c < 0.0 {
            return None;
        }

        let r = self.radius();
        let x = r * lat.cos() * d_lng.sin();
        let y = r * (lat0.cos() * lat.sin() - lat0.sin() * lat.cos() * d_lng.cos());
        let origin = self.viewport.center();
        Some(Pos2::new(origin.x + x as f32, origin.y - y as f32))
    }

    /// Drag the globe by a screen delta
    pub fn pan_by(&mut self, delta: Vec2) {
        if self.removed {
            return;
        }
        self.transition = None;
        let r = self.radius().max(1.0);
        let d_lng = -(delta.x as f64 / r).to_degrees();
        let d_lat = (delta.y as f64 / r).to_degrees();
        self.camera.center = LngLat::new(
            normalize_lng(self.camera.center.lng + d_lng),
            (self.camera.center.lat + d_lat).clamp(-MAX_LATITUDE, MAX_LATITUDE),
        );
    }

    /// Scroll zoom; positive delta zooms in
    pub fn scroll_zoom(&mut self, scroll: f32) {
        if self.removed || scroll == 0.0 {
            return;
        }
        self.transition = None;
        self.camera.zoom = self.clamp_zoom(self.camera.zoom + scroll as f64 * SCROLL_ZOOM_RATE);
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.options.min_zoom, self.options.max_zoom)
    }

    fn start_transition(&mut self, camera: CameraOptions, easing: Easing) {
        if self.removed {
            return;
        }
        let target = Camera {
            center: camera.center.unwrap_or(self.camera.center),
            zoom: camera.zoom.map(|z| self.clamp_zoom(z)).unwrap_or(self.camera.zoom),
        };
        let duration = camera.duration.as_secs_f64();
        if duration <= 0.0 {
            self.camera = target;
            self.transition = None;
            return;
        }
        self.transition = Some(Transition {
            from: self.camera,
            to: target,
            start: self.clock,
            duration,
            easing,
        });
    }

    /// Draw background, atmosphere, globe, borders and point layers
    pub fn paint(&self, painter: &Painter, high_contrast: bool) {
        if self.removed {
            return;
        }
        let origin = self.viewport.center();
        let r = self.radius() as f32;

        let fog = self.fog.unwrap_or(Fog {
            color: Color32::from_rgb(186, 210, 235),
            high_color: Color32::from_rgb(36, 92, 223),
            horizon_blend: 0.02,
            space_color: Color32::BLACK,
            star_intensity: 0.0,
        });

        let space = if high_contrast { Color32::BLACK } else { fog.space_color };
        painter.rect_filled(self.viewport, 0.0, space);
        if !high_contrast {
            self.paint_stars(painter, fog.star_intensity);
            paint_atmosphere(painter, origin, r, &fog);
        }

        let ocean = if high_contrast { Color32::BLACK } else { Color32::from_rgb(16, 44, 78) };
        let rim = if high_contrast { Stroke::new(2.0, Color32::WHITE) } else { Stroke::new(1.0, fog.color) };
        painter.circle(origin, r, ocean, rim);

        let grid = if high_contrast {
            Stroke::new(1.0, Color32::GRAY)
        } else {
            Stroke::new(0.5, Color32::from_rgba_unmultiplied(186, 210, 235, 40))
        };
        self.paint_graticule(painter, grid);

        let land = if high_contrast {
            Stroke::new(1.5, Color32::WHITE)
        } else {
            Stroke::new(1.0, Color32::from_rgb(132, 170, 120))
        };
        for line in &self.borders {
            self.paint_polyline(painter, line.iter().copied(), land);
        }

        for layer in &self.layers {
            let Some(features) = self.sources.get(&layer.source) else {
                continue;
            };
            // Selected and hovered features are drawn last so they stay on top
            let mut styled: Vec<_> = features
                .iter()
                .filter_map(|f| {
                    let pos = self.project(f.position)?;
                    let state = self.feature_state(&layer.source, f.id);
                    Some((state, pos, layer.paint.resolve(state, f.status)))
                })
                .collect();
            styled.sort_by_key(|(state, _, _)| (state.selected, state.hovered));
            for (_, pos, style) in styled {
                let stroke = if high_contrast {
                    Stroke::new(style.stroke.width + 1.0, Color32::WHITE)
                } else {
                    style.stroke
                };
                painter.circle(pos, style.radius, style.fill, stroke);
            }
        }
    }

    fn paint_stars(&self, painter: &Painter, intensity: f32) {
        if intensity <= 0.0 {
            return;
        }
        let rect = self.viewport;
        for i in 0..STAR_COUNT {
            let h = star_hash(i);
            let x = rect.left() + rect.width() * unit(h);
            let y = rect.top() + rect.height() * unit(h.rotate_left(11));
            let brightness = (0.3 + 0.7 * unit(h.rotate_left(22))) * intensity;
            let alpha = (brightness * 255.0) as u8;
            painter.circle_filled(Pos2::new(x, y), 0.8, Color32::from_white_alpha(alpha));
        }
    }

    fn paint_graticule(&self, painter: &Painter, stroke: Stroke) {
        let mut lng = -180.0;
        while lng < 180.0 {
            let meridian = (0..=60).map(|i| LngLat::new(lng, -90.0 + i as f64 * 3.0));
            self.paint_polyline(painter, meridian, stroke);
            lng += GRATICULE_STEP;
        }
        let mut lat = -60.0;
        while lat <= 60.0 {
            let parallel = (0..=120).map(|i| LngLat::new(-180.0 + i as f64 * 3.0, lat));
            self.paint_polyline(painter, parallel, stroke);
            lat += GRATICULE_STEP;
        }
    }

    /// Polyline split wherever it crosses to the far hemisphere
    fn paint_polyline(&self, painter: &Painter, points: impl Iterator<Item = LngLat>, stroke: Stroke) {
        let mut run: Vec<Pos2> = Vec::new();
        for p in points {
            match self.project(p) {
                Some(pos) => run.push(pos),
                None => {
                    if run.len() >= 2 {
                        painter.add(Shape::line(std::mem::take(&mut run), stroke));
                    } else {
                        run.clear();
                    }
                }
            }
        }
        if run.len() >= 2 {
            painter.add(Shape::line(run, stroke));
        }
    }
}

impl MapHost for GlobeMap {
    fn center(&self) -> LngLat {
        self.camera.center
    }

    fn zoom(&self) -> f64 {
        self.camera.zoom
    }

    fn is_flying(&self) -> bool {
        self.transition.is_some_and(|t| t.duration > SINGLE_FRAME)
    }

    fn ease_to(&mut self, camera: CameraOptions) {
        self.start_transition(camera, Easing::Linear);
    }

    fn fly_to(&mut self, camera: CameraOptions) {
        tracing::debug!("fly_to center={:?} zoom={:?} duration={:?}", camera.center, camera.zoom, camera.duration);
        self.start_transition(camera, Easing::EaseInOutCubic);
    }

    fn set_feature_flag(&mut self, source: &str, id: TempleId, flag: FeatureFlag, value: bool) {
        if self.removed {
            return;
        }
        self.feature_states
            .entry((source.to_string(), id))
            .or_default()
            .set(flag, value);
    }

    fn feature_state(&self, source: &str, id: TempleId) -> FeatureState {
        self.feature_states
            .get(&(source.to_string(), id))
            .copied()
            .unwrap_or_default()
    }

    fn query_rendered_features(&self, point: Pos2, layer: &str) -> Vec<TempleId> {
        if self.removed {
            return Vec::new();
        }
        let Some(layer) = self.layers.iter().find(|l| l.id == layer) else {
            return Vec::new();
        };
        let Some(features) = self.sources.get(&layer.source) else {
            return Vec::new();
        };

        let mut hits: Vec<(f32, TempleId)> = features
            .iter()
            .filter_map(|f| {
                let pos = self.project(f.position)?;
                let style = layer.paint.resolve(self.feature_state(&layer.source, f.id), f.status);
                let distance = pos.distance(point);
                (distance <= style.radius + HIT_SLOP).then_some((distance, f.id))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, id)| id).collect()
    }

    fn add_point_source(&mut self, name: &str, features: Vec<PointFeature>) {
        if self.removed {
            return;
        }
        tracing::debug!("Adding source '{}' with {} features", name, features.len());
        self.sources.insert(name.to_string(), features);
    }

    fn add_circle_layer(&mut self, layer: CircleLayer) {
        if self.removed {
            return;
        }
        tracing::debug!("Adding layer '{}' on source '{}'", layer.id, layer.source);
        self.layers.retain(|l| l.id != layer.id);
        self.layers.push(layer);
    }

    fn set_fog(&mut self, fog: Fog) {
        if !self.removed {
            self.fog = Some(fog);
        }
    }

    fn remove(&mut self) {
        tracing::info!("Releasing globe map");
        self.removed = true;
        self.transition = None;
        self.sources.clear();
        self.layers.clear();
        self.feature_states.clear();
        self.borders.clear();
    }
}

fn paint_atmosphere(painter: &Painter, origin: Pos2, r: f32, fog: &Fog) {
    // Rings fade from the lower atmosphere color to the upper one
    const RINGS: usize = 16;
    let thickness = (r * fog.horizon_blend.max(0.01) * 4.0).max(6.0);
    for i in (0..RINGS).rev() {
        let t = i as f32 / (RINGS - 1) as f32;
        let color = lerp_color(fog.color, fog.high_color, t);
        let alpha = ((1.0 - t) * 90.0) as u8;
        painter.circle_filled(
            origin,
            r + thickness * t,
            Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha),
        );
    }
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}

fn star_hash(i: u32) -> u32 {
    let mut h = i.wrapping_mul(0x9E37_79B9).wrapping_add(0x7F4A_7C15);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^ (h >> 16)
}

fn unit(h: u32) -> f32 {
    (h & 0xFFFF) as f32 / 65535.0
}

/// Signed degrees from `from` to `to` along the short way round
fn shortest_lng_delta(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

/// Wrap longitude into [-180, 180)
pub fn normalize_lng(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Status;
    use crate::map::layer::CirclePaint;
    use crate::map::{TEMPLE_LAYER, TEMPLE_SOURCE};
    use std::time::Duration;

    fn map_at(center: LngLat, zoom: f64) -> GlobeMap {
        let mut map = GlobeMap::new(MapOptions { center, zoom, min_zoom: 0.0, max_zoom: 12.0 });
        map.set_viewport(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)));
        map
    }

    fn with_points(mut map: GlobeMap, points: &[(TempleId, LngLat)]) -> GlobeMap {
        let features = points
            .iter()
            .map(|(id, position)| PointFeature { id: *id, position: *position, status: Status::Operating })
            .collect();
        map.add_point_source(TEMPLE_SOURCE, features);
        map.add_circle_layer(CircleLayer {
            id: TEMPLE_LAYER.to_string(),
            source: TEMPLE_SOURCE.to_string(),
            paint: CirclePaint::default(),
        });
        map
    }

    #[test]
    fn test_center_projects_to_viewport_center() {
        let map = map_at(LngLat::new(-111.0, 40.0), 3.0);
        let pos = map.project(LngLat::new(-111.0, 40.0)).unwrap();
        assert!((pos.x - 400.0).abs() < 1e-3);
        assert!((pos.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_far_side_is_hidden() {
        let map = map_at(LngLat::new(0.0, 0.0), 3.0);
        assert!(map.project(LngLat::new(180.0, 0.0)).is_none());
        assert!(map.project(LngLat::new(60.0, 10.0)).is_some());
    }

    #[test]
    fn test_north_is_up_and_east_is_right() {
        let map = map_at(LngLat::new(0.0, 0.0), 3.0);
        let north = map.project(LngLat::new(0.0, 10.0)).unwrap();
        let east = map.project(LngLat::new(10.0, 0.0)).unwrap();
        assert!(north.y < 300.0);
        assert!(east.x > 400.0);
    }

    #[test]
    fn test_zero_duration_jumps() {
        let mut map = map_at(LngLat::new(0.0, 20.0), 3.0);
        map.ease_to(CameraOptions::zoom(5.0, Duration::ZERO));
        assert_eq!(map.zoom(), 5.0);
        assert!(!map.is_flying());
    }

    #[test]
    fn test_fly_to_interpolates_and_finishes() {
        let mut map = map_at(LngLat::new(0.0, 20.0), 3.0);
        map.advance(10.0);
        map.fly_to(CameraOptions {
            center: Some(LngLat::new(-111.0, 40.0)),
            zoom: Some(8.0),
            duration: Duration::from_secs(2),
        });
        assert!(map.is_flying());

        map.advance(11.0);
        assert!(map.zoom() > 3.0 && map.zoom() < 8.0);

        map.advance(12.5);
        assert!(!map.is_flying());
        assert_eq!(map.zoom(), 8.0);
        assert!((map.center().lng + 111.0).abs() < 1e-9);
    }

    #[test]
    fn test_transition_takes_short_way_across_antimeridian() {
        let mut map = map_at(LngLat::new(170.0, 0.0), 3.0);
        map.ease_to(CameraOptions::center(LngLat::new(-170.0, 0.0), Duration::from_secs(1)));
        map.advance(0.5);
        let lng = map.center().lng;
        assert!(lng >= 170.0 || lng <= -170.0, "went the long way: {lng}");
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut map = map_at(LngLat::new(0.0, 0.0), 3.0);
        map.ease_to(CameraOptions::zoom(40.0, Duration::ZERO));
        assert_eq!(map.zoom(), 12.0);
        map.scroll_zoom(-1_000_000.0);
        assert_eq!(map.zoom(), 0.0);
    }

    #[test]
    fn test_hit_testing_returns_nearest_first() {
        let map = with_points(
            map_at(LngLat::new(0.0, 0.0), 3.0),
            &[(1, LngLat::new(0.0, 0.0)), (2, LngLat::new(0.1, 0.0)), (3, LngLat::new(30.0, 0.0))],
        );
        let at_first = map.project(LngLat::new(0.0, 0.0)).unwrap();

        let hits = map.query_rendered_features(at_first, TEMPLE_LAYER);
        assert_eq!(hits, vec![1, 2]);
        assert!(map.query_rendered_features(Pos2::new(5.0, 5.0), TEMPLE_LAYER).is_empty());
        assert!(map.query_rendered_features(at_first, "other-layer").is_empty());
    }

    #[test]
    fn test_hidden_points_are_not_hit() {
        let map = with_points(map_at(LngLat::new(0.0, 0.0), 0.0), &[(1, LngLat::new(180.0, 0.0))]);
        // At zoom 0 the globe is tiny; the antipode projects nowhere
        assert!(map.query_rendered_features(Pos2::new(400.0, 300.0), TEMPLE_LAYER).is_empty());
    }

    #[test]
    fn test_pan_moves_center_against_drag() {
        let mut map = map_at(LngLat::new(0.0, 0.0), 3.0);
        map.pan_by(Vec2::new(100.0, 0.0));
        assert!(map.center().lng < 0.0);
        map.pan_by(Vec2::new(0.0, 1.0e6));
        assert_eq!(map.center().lat, MAX_LATITUDE);
    }

    #[test]
    fn test_removed_map_ignores_everything() {
        let mut map = with_points(map_at(LngLat::new(0.0, 0.0), 3.0), &[(1, LngLat::new(0.0, 0.0))]);
        map.remove();
        map.set_feature_flag(TEMPLE_SOURCE, 1, FeatureFlag::Selected, true);
        map.fly_to(CameraOptions::zoom(8.0, Duration::from_secs(1)));

        assert!(map.is_removed());
        assert!(!map.feature_state(TEMPLE_SOURCE, 1).selected);
        assert!(!map.is_flying());
        assert!(map.query_rendered_features(Pos2::new(400.0, 300.0), TEMPLE_LAYER).is_empty());
    }

    #[test]
    fn test_normalize_lng() {
        assert_eq!(normalize_lng(190.0), -170.0);
        assert_eq!(normalize_lng(-190.0), 170.0);
        assert_eq!(normalize_lng(45.0), 45.0);
        assert_eq!(shortest_lng_delta(170.0, -170.0), 20.0);
    }
}
