//! Circle layer paint and atmosphere settings

use egui::{Color32, Stroke};

use super::FeatureState;
use crate::config::FogConfig;
use crate::dataset::Status;

/// Resolved look of one circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleStyle {
    pub radius: f32,
    pub fill: Color32,
    pub stroke: Stroke,
}

/// Paint properties keyed on {selected, hovered} and status
#[derive(Debug, Clone, PartialEq)]
pub struct CirclePaint {
    pub radius: f32,
    pub hovered_radius: f32,
    pub selected_radius: f32,
    pub operating_color: Color32,
    pub inactive_color: Color32,
    pub selected_color: Color32,
    pub stroke_color: Color32,
    pub stroke_width: f32,
    pub highlight_stroke_width: f32,
}

impl Default for CirclePaint {
    fn default() -> Self {
        Self {
            radius: 5.0,
            hovered_radius: 7.0,
            selected_radius: 9.0,
            operating_color: Color32::from_rgb(212, 175, 55),
            inactive_color: Color32::from_rgb(120, 144, 168),
            selected_color: Color32::from_rgb(255, 94, 58),
            stroke_color: Color32::WHITE,
            stroke_width: 1.0,
            highlight_stroke_width: 2.5,
        }
    }
}

impl CirclePaint {
    pub fn resolve(&self, state: FeatureState, status: Status) -> CircleStyle {
        let radius = if state.selected {
            self.selected_radius
        } else if state.hovered {
            self.hovered_radius
        } else {
            self.radius
        };

        let fill = if state.selected {
            self.selected_color
        } else if status.is_operating() {
            self.operating_color
        } else {
            self.inactive_color
        };

        let width = if state.selected || state.hovered {
            self.highlight_stroke_width
        } else {
            self.stroke_width
        };

        CircleStyle {
            radius,
            fill,
            stroke: Stroke::new(width, self.stroke_color),
        }
    }
}

/// Layer drawing every feature of `source` as a circle
#[derive(Debug, Clone, PartialEq)]
pub struct CircleLayer {
    pub id: String,
    pub source: String,
    pub paint: CirclePaint,
}

/// Atmosphere and space background
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Color32,
    pub high_color: Color32,
    pub horizon_blend: f32,
    pub space_color: Color32,
    pub star_intensity: f32,
}

impl From<&FogConfig> for Fog {
    fn from(cfg: &FogConfig) -> Self {
        let rgb = |c: [u8; 3]| Color32::from_rgb(c[0], c[1], c[2]);
        Self {
            color: rgb(cfg.color),
            high_color: rgb(cfg.high_color),
            horizon_blend: cfg.horizon_blend.clamp(0.0, 1.0),
            space_color: rgb(cfg.space_color),
            star_intensity: cfg.star_intensity.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_wins_over_hovered() {
        let paint = CirclePaint::default();
        let both = FeatureState { hovered: true, selected: true };
        let style = paint.resolve(both, Status::Announced);

        assert_eq!(style.radius, paint.selected_radius);
        assert_eq!(style.fill, paint.selected_color);
    }

    #[test]
    fn test_status_colors() {
        let paint = CirclePaint::default();
        let idle = FeatureState::default();

        assert_eq!(paint.resolve(idle, Status::Operating).fill, paint.operating_color);
        assert_eq!(paint.resolve(idle, Status::UnderConstruction).fill, paint.inactive_color);

        let hovered = FeatureState { hovered: true, selected: false };
        let style = paint.resolve(hovered, Status::Operating);
        assert_eq!(style.radius, paint.hovered_radius);
        assert_eq!(style.stroke.width, paint.highlight_stroke_width);
    }

    #[test]
    fn test_fog_from_config_clamps() {
        let cfg = FogConfig { star_intensity: 3.0, ..FogConfig::default() };
        let fog = Fog::from(&cfg);
        assert_eq!(fog.star_intensity, 1.0);
        assert_eq!(fog.space_color, Color32::from_rgb(11, 11, 25));
    }
}
