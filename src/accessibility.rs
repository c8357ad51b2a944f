//! Accessibility preferences: text size, high contrast, reduced motion
//!
//! Stored as three independent string entries so a toggle only ever
//! rewrites its own key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const TEXT_SIZE_KEY: &str = "accessibility-text-size";
pub const HIGH_CONTRAST_KEY: &str = "accessibility-high-contrast";
pub const REDUCED_MOTION_KEY: &str = "accessibility-reduced-motion";

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Failed to access preference file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid preference file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    Small,
    #[default]
    Normal,
    Large,
    Xl,
}

impl TextSize {
    pub const ALL: [TextSize; 4] = [TextSize::Small, TextSize::Normal, TextSize::Large, TextSize::Xl];

    pub fn key(&self) -> &'static str {
        match self {
            TextSize::Small => "small",
            TextSize::Normal => "normal",
            TextSize::Large => "large",
            TextSize::Xl => "xl",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TextSize::Small => "Small",
            TextSize::Normal => "Normal",
            TextSize::Large => "Large",
            TextSize::Xl => "Extra Large",
        }
    }

    /// Unknown values fall back to normal
    pub fn from_key(key: &str) -> TextSize {
        TextSize::ALL
            .into_iter()
            .find(|s| s.key() == key)
            .unwrap_or_default()
    }

    pub fn scale(&self) -> f32 {
        match self {
            TextSize::Small => 0.875,
            TextSize::Normal => 1.0,
            TextSize::Large => 1.25,
            TextSize::Xl => 1.5,
        }
    }
}

impl fmt::Display for TextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preferences {
    pub text_size: TextSize,
    pub high_contrast: bool,
    pub reduced_motion: bool,
}

/// Global presentation switches derived from [`Preferences`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub text_scale: f32,
    pub high_contrast: bool,
    pub animations: bool,
}

impl Preferences {
    pub fn presentation(&self) -> Presentation {
        Presentation {
            text_scale: self.text_size.scale(),
            high_contrast: self.high_contrast,
            animations: !self.reduced_motion,
        }
    }
}

/// String key/value persistence
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// YAML file of key/value pairs, rewritten on every set
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: PathBuf) -> Result<Self, PreferenceError> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let entries: Option<BTreeMap<String, String>> = serde_yaml::from_str(&content)?;
            tracing::info!("Loaded accessibility preferences from {:?}", path);
            entries.unwrap_or_default()
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    /// Open `path`, starting empty if it is unreadable
    pub fn open_or_empty(path: PathBuf) -> Self {
        match Self::open(path.clone()) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Ignoring preference file {:?}: {}", path, e);
                Self { path, entries: BTreeMap::new() }
            }
        }
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        let yaml = serde_yaml::to_string(&self.entries)?;
        std::fs::write(&self.path, yaml)?;
        Ok(())
    }
}

/// In-memory store
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub entries: BTreeMap<String, String>,
}

#[cfg(test)]
impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences plus their backing store
pub struct AccessibilitySettings<S: PreferenceStore> {
    store: S,
    prefs: Preferences,
}

impl<S: PreferenceStore> AccessibilitySettings<S> {
    /// Read all three values once, defaulting missing ones
    pub fn load(store: S) -> Self {
        let prefs = Preferences {
            text_size: store.get(TEXT_SIZE_KEY).map(|v| TextSize::from_key(&v)).unwrap_or_default(),
            high_contrast: store.get(HIGH_CONTRAST_KEY).as_deref() == Some("true"),
            reduced_motion: store.get(REDUCED_MOTION_KEY).as_deref() == Some("true"),
        };
        tracing::debug!("Accessibility preferences: {:?}", prefs);
        Self { store, prefs }
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set_text_size(&mut self, size: TextSize) -> Presentation {
        self.prefs.text_size = size;
        self.persist(TEXT_SIZE_KEY, size.key());
        self.prefs.presentation()
    }

    pub fn toggle_high_contrast(&mut self) -> Presentation {
        self.prefs.high_contrast = !self.prefs.high_contrast;
        self.persist(HIGH_CONTRAST_KEY, bool_str(self.prefs.high_contrast));
        self.prefs.presentation()
    }

    pub fn toggle_reduced_motion(&mut self) -> Presentation {
        self.prefs.reduced_motion = !self.prefs.reduced_motion;
        self.persist(REDUCED_MOTION_KEY, bool_str(self.prefs.reduced_motion));
        self.prefs.presentation()
    }

    /// Restore and persist all defaults
    pub fn reset(&mut self) -> Presentation {
        self.prefs = Preferences::default();
        self.persist(TEXT_SIZE_KEY, self.prefs.text_size.key());
        self.persist(HIGH_CONTRAST_KEY, "false");
        self.persist(REDUCED_MOTION_KEY, "false");
        self.prefs.presentation()
    }

    fn persist(&mut self, key: &str, value: &str) {
        // The in-memory value stays authoritative if the write fails
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!("Failed to persist {}={}: {}", key, value, e);
        }
    }
}

fn bool_str(v: bool) -> &'static str {
    if v {
        "true"
    } else {
        "false"
    }
}

/// Apply the presentation switches to the egui context
pub fn apply(ctx: &egui::Context, presentation: Presentation) {
    let mut visuals = if presentation.high_contrast {
        high_contrast_visuals()
    } else {
        egui::Visuals::dark()
    };
    if !presentation.animations {
        visuals.window_shadow = egui::epaint::Shadow::NONE;
    }
    ctx.set_visuals(visuals);

    ctx.style_mut(|style| {
        let defaults = egui::Style::default();
        for (text_style, font) in style.text_styles.iter_mut() {
            if let Some(base) = defaults.text_styles.get(text_style) {
                font.size = base.size * presentation.text_scale;
            }
        }
        style.animation_time = if presentation.animations { defaults.animation_time } else { 0.0 };
    });
}

fn high_contrast_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();
    visuals.override_text_color = Some(egui::Color32::WHITE);
    visuals.panel_fill = egui::Color32::BLACK;
    visuals.window_fill = egui::Color32::BLACK;
    visuals.extreme_bg_color = egui::Color32::BLACK;
    visuals.window_stroke = egui::Stroke::new(2.0, egui::Color32::WHITE);
    visuals.selection.bg_fill = egui::Color32::from_rgb(255, 221, 0);
    visuals.selection.stroke = egui::Stroke::new(2.0, egui::Color32::BLACK);
    visuals.hyperlink_color = egui::Color32::from_rgb(255, 221, 0);
    for widget in [
        &mut visuals.widgets.inactive,
        &mut visuals.widgets.hovered,
        &mut visuals.widgets.active,
        &mut visuals.widgets.open,
    ] {
        widget.bg_stroke = egui::Stroke::new(1.5, egui::Color32::WHITE);
        widget.fg_stroke = egui::Stroke::new(1.5, egui::Color32::WHITE);
    }
    visuals
}
