//! Native globe viewer using egui
//!
//! Translates window input into map events, draws the globe, the detail
//! panel with its carousel, and the accessibility settings window.

use eframe::egui;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::accessibility::{self, AccessibilitySettings, FileStore, Presentation, TextSize};
use crate::config::Config;
use crate::dataset::{Dataset, Temple, TempleId};
use crate::detail::{self, NavKey};
use crate::images::{ImageCache, ImageStatus};
use crate::map::borders::load_borders;
use crate::map::globe::{GlobeMap, MapOptions};
use crate::map::MapEvent;
use crate::viewer::Viewer;

const THUMBNAIL_SIZE: egui::Vec2 = egui::vec2(72.0, 48.0);

/// Run the native GUI viewer
pub fn run_viewer(config: Config, dataset: Dataset, user_agent: &str) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_title("Temple Globe"),
        ..Default::default()
    };

    let runtime = tokio::runtime::Handle::current();
    let images = ImageCache::new(runtime, user_agent);

    eframe::run_native(
        "Temple Globe",
        options,
        Box::new(|cc| Ok(Box::new(GlobeApp::new(cc, config, dataset, images)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

/// Deferred detail-panel actions, applied after the panel is drawn
enum DetailAction {
    Close,
    Key(NavKey),
    CarouselPrev,
    CarouselNext,
    CarouselGoTo(usize),
    ToggleAutoPlay,
    ImageFailed(usize),
}

enum SettingsAction {
    TextSize(TextSize),
    HighContrast,
    ReducedMotion,
    Reset,
}

struct GlobeApp {
    viewer: Viewer,
    map: GlobeMap,
    settings: AccessibilitySettings<FileStore>,
    presentation: Presentation,
    images: ImageCache,
    thumbnail_placeholder: String,
    /// Temple whose images are resident in the cache
    shown_temple: Option<TempleId>,
    settings_open: bool,
    started: Instant,
    last_frame: Instant,
    pointer_inside: bool,
    pointer_pressed: bool,
}

impl GlobeApp {
    fn new(cc: &eframe::CreationContext<'_>, config: Config, dataset: Dataset, images: ImageCache) -> Self {
        let mut map = GlobeMap::new(MapOptions::from(&config.map));
        if let Some(path) = &config.borders {
            match load_borders(path) {
                Ok(lines) => {
                    info!("Loaded {} border lines from {:?}", lines.len(), path);
                    map.set_borders(lines);
                }
                Err(e) => warn!("Skipping borders {:?}: {}", path, e),
            }
        }

        let settings = AccessibilitySettings::load(FileStore::open_or_empty(config.preferences_path.0.clone()));
        let presentation = settings.preferences().presentation();
        accessibility::apply(&cc.egui_ctx, presentation);

        let mut viewer = Viewer::new(dataset.renderable(), &config);
        viewer.apply_presentation(presentation);

        let now = Instant::now();
        Self {
            viewer,
            map,
            settings,
            presentation,
            images,
            thumbnail_placeholder: config.carousel.thumbnail_placeholder_url.clone(),
            shown_temple: None,
            settings_open: false,
            started: now,
            last_frame: now,
            pointer_inside: false,
            pointer_pressed: false,
        }
    }

    fn set_presentation(&mut self, ctx: &egui::Context, presentation: Presentation) {
        self.presentation = presentation;
        accessibility::apply(ctx, presentation);
        self.viewer.apply_presentation(presentation);
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (keys, activate) = ctx.input(|i| {
            let mut keys = Vec::new();
            for (key, nav) in [
                (egui::Key::Escape, NavKey::Escape),
                (egui::Key::Backspace, NavKey::Back),
                (egui::Key::ArrowLeft, NavKey::Left),
                (egui::Key::ArrowRight, NavKey::Right),
                (egui::Key::ArrowUp, NavKey::Up),
                (egui::Key::ArrowDown, NavKey::Down),
            ] {
                if i.key_pressed(key) {
                    keys.push(nav);
                }
            }
            let activate = i.key_pressed(egui::Key::Enter) || i.key_pressed(egui::Key::Space);
            (keys, activate)
        });
        // A focused button consumes Enter/Space itself
        let widget_focused = ctx.memory(|m| m.focused().is_some());

        for key in keys {
            self.viewer.handle_key(&mut self.map, key);
        }
        if activates_marker(activate, widget_focused) {
            self.viewer.activate_hovered(&mut self.map);
        }
    }

    /// Drop cached images once the detail view moves to another temple
    fn release_stale_images(&mut self) {
        let current = self.viewer.current_temple().map(|t| t.id);
        if current == self.shown_temple {
            return;
        }
        self.shown_temple = current;

        let mut keep = vec![self.thumbnail_placeholder.clone()];
        if let Some(carousel) = self.viewer.carousel() {
            keep.extend(carousel.images().iter().cloned());
        }
        self.images.retain(&keep);
    }

    fn map_panel(&mut self, ui: &mut egui::Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        self.map.set_viewport(rect);

        let (pressed, released, touch_end, scroll) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.events
                    .iter()
                    .any(|e| matches!(e, egui::Event::Touch { phase: egui::TouchPhase::End, .. })),
                i.smooth_scroll_delta.y,
            )
        });

        if pressed && response.hovered() {
            self.pointer_pressed = true;
            self.viewer.handle_event(&mut self.map, MapEvent::PointerDown);
        }
        if response.dragged() {
            self.map.pan_by(response.drag_delta());
        }
        if self.pointer_pressed && (released || touch_end) {
            self.pointer_pressed = false;
            let event = if touch_end { MapEvent::TouchEnd } else { MapEvent::PointerUp };
            self.viewer.handle_event(&mut self.map, event);
        }

        if response.hovered() && scroll != 0.0 {
            self.map.scroll_zoom(scroll);
        }

        if let Some(pos) = response.interact_pointer_pos() {
            if response.double_clicked() {
                self.viewer.handle_event(&mut self.map, MapEvent::DoubleClick { pos });
            } else if response.clicked() {
                self.viewer.handle_event(&mut self.map, MapEvent::Click { pos });
            }
        }

        match response.hover_pos() {
            Some(pos) => {
                self.pointer_inside = true;
                self.viewer.handle_event(&mut self.map, MapEvent::PointerMove { pos });
            }
            None if self.pointer_inside => {
                self.pointer_inside = false;
                self.viewer.handle_event(&mut self.map, MapEvent::PointerLeave);
            }
            None => {}
        }

        if self.viewer.selection().hovered().is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        let painter = ui.painter_at(rect);
        self.map.paint(&painter, self.presentation.high_contrast);
    }

    fn detail_panel(&mut self, ctx: &egui::Context, temple: &Temple) {
        let cards = detail::cards(temple);
        let carousel = self
            .viewer
            .carousel()
            .map(|c| (c.images().to_vec(), c.current().to_string(), c.index(), c.counter(), c.is_auto_playing()));
        let images = &mut self.images;
        let thumbnail_placeholder = &self.thumbnail_placeholder;
        let mut actions = Vec::new();

        egui::SidePanel::right("detail_panel")
            .min_width(360.0)
            .default_width(420.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("◀ Previous").clicked() {
                        actions.push(DetailAction::Key(NavKey::Left));
                    }
                    if ui.button("Next ▶").clicked() {
                        actions.push(DetailAction::Key(NavKey::Right));
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("✕ Close").clicked() {
                            actions.push(DetailAction::Close);
                        }
                    });
                });
                ui.separator();

                ui.heading(&temple.name);
                ui.label(format!("{}, {}", temple.place_label(), temple.location.country));
                ui.label(egui::RichText::new(temple.status.label()).strong());
                ui.add_space(6.0);

                egui::ScrollArea::vertical().show(ui, |ui| {
                    if let Some((urls, current, index, counter, playing)) = &carousel {
                        let state = CarouselView { urls, current, index: *index, counter, playing: *playing };
                        carousel_ui(ui, images, thumbnail_placeholder, &state, &mut actions);
                        ui.add_space(8.0);
                    }

                    for card in &cards {
                        ui.group(|ui| {
                            ui.set_width(ui.available_width());
                            ui.strong(card.title);
                            egui::Grid::new(card.title).num_columns(2).striped(true).show(ui, |ui| {
                                for (label, value) in &card.rows {
                                    ui.label(*label);
                                    ui.label(value);
                                    ui.end_row();
                                }
                            });
                            if let Some(body) = &card.body {
                                ui.add_space(4.0);
                                ui.label(body);
                            }
                        });
                        ui.add_space(6.0);
                    }

                    if let Some(url) = temple.media.as_ref().and_then(|m| m.video_url.as_deref()) {
                        ui.hyperlink_to("Watch video", url);
                    }
                });
            });

        for action in actions {
            match action {
                DetailAction::Close => {
                    self.viewer.close_detail(&mut self.map);
                }
                DetailAction::Key(key) => {
                    self.viewer.handle_key(&mut self.map, key);
                }
                DetailAction::CarouselPrev => {
                    if let Some(c) = self.viewer.carousel_mut() {
                        c.prev();
                    }
                }
                DetailAction::CarouselNext => {
                    if let Some(c) = self.viewer.carousel_mut() {
                        c.next();
                    }
                }
                DetailAction::CarouselGoTo(index) => {
                    if let Some(c) = self.viewer.carousel_mut() {
                        c.go_to(index);
                    }
                }
                DetailAction::ToggleAutoPlay => {
                    if let Some(c) = self.viewer.carousel_mut() {
                        c.toggle_auto_play();
                    }
                }
                DetailAction::ImageFailed(index) => {
                    if let Some(c) = self.viewer.carousel_mut() {
                        c.image_failed(index);
                    }
                }
            }
        }
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        let prefs = self.settings.preferences();
        let mut open = self.settings_open;
        let mut action = None;

        egui::Window::new("Accessibility")
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.label("Text size");
                ui.horizontal(|ui| {
                    for size in TextSize::ALL {
                        if ui.selectable_label(prefs.text_size == size, size.label()).clicked() {
                            action = Some(SettingsAction::TextSize(size));
                        }
                    }
                });
                ui.separator();

                let mut high_contrast = prefs.high_contrast;
                if ui.checkbox(&mut high_contrast, "High contrast").changed() {
                    action = Some(SettingsAction::HighContrast);
                }
                let mut reduced_motion = prefs.reduced_motion;
                if ui
                    .checkbox(&mut reduced_motion, "Reduce motion")
                    .on_hover_text("Stops the globe spin and camera animations")
                    .changed()
                {
                    action = Some(SettingsAction::ReducedMotion);
                }
                ui.separator();

                if ui.button("Reset to Defaults").clicked() {
                    action = Some(SettingsAction::Reset);
                }
            });
        self.settings_open = open;

        let presentation = match action {
            Some(SettingsAction::TextSize(size)) => self.settings.set_text_size(size),
            Some(SettingsAction::HighContrast) => self.settings.toggle_high_contrast(),
            Some(SettingsAction::ReducedMotion) => self.settings.toggle_reduced_motion(),
            Some(SettingsAction::Reset) => self.settings.reset(),
            None => return,
        };
        self.set_presentation(ctx, presentation);
    }
}

/// Enter/Space open the hovered marker unless an egui widget has focus
fn activates_marker(pressed: bool, widget_focused: bool) -> bool {
    pressed && !widget_focused
}

/// Carousel snapshot taken before the detail panel borrows the image cache
struct CarouselView<'a> {
    urls: &'a [String],
    current: &'a str,
    index: usize,
    counter: &'a str,
    playing: bool,
}

fn carousel_ui(
    ui: &mut egui::Ui,
    images: &mut ImageCache,
    thumbnail_placeholder: &str,
    state: &CarouselView<'_>,
    actions: &mut Vec<DetailAction>,
) {
    let CarouselView { urls, current, index, counter, playing } = *state;
    let width = ui.available_width();
    let ctx = ui.ctx().clone();

    match images.get(&ctx, current) {
        ImageStatus::Ready(texture) => {
            ui.add(egui::Image::new(texture).max_width(width).max_height(280.0).rounding(4.0));
        }
        ImageStatus::Loading => {
            ui.allocate_ui(egui::vec2(width, 200.0), |ui| {
                ui.centered_and_justified(|ui| ui.add(egui::Spinner::new()));
            });
        }
        ImageStatus::Failed => {
            actions.push(DetailAction::ImageFailed(index));
            ui.label("Image unavailable");
        }
    }

    ui.horizontal(|ui| {
        if ui.button("◀").on_hover_text("Previous image").clicked() {
            actions.push(DetailAction::CarouselPrev);
        }
        ui.label(counter);
        if ui.button("▶").on_hover_text("Next image").clicked() {
            actions.push(DetailAction::CarouselNext);
        }
        let toggle = if playing { "⏸ Pause" } else { "▶ Play" };
        if urls.len() > 1 && ui.button(toggle).clicked() {
            actions.push(DetailAction::ToggleAutoPlay);
        }
    });

    if urls.len() < 2 {
        return;
    }
    egui::ScrollArea::horizontal().id_salt("thumbnails").show(ui, |ui| {
        ui.horizontal(|ui| {
            for (i, url) in urls.iter().enumerate() {
                let response = match images.get(&ctx, url) {
                    ImageStatus::Ready(texture) => ui.add(
                        egui::Image::new(texture)
                            .fit_to_exact_size(THUMBNAIL_SIZE)
                            .sense(egui::Sense::click()),
                    ),
                    ImageStatus::Failed => match images.get(&ctx, thumbnail_placeholder) {
                        ImageStatus::Ready(texture) => ui.add(
                            egui::Image::new(texture)
                                .fit_to_exact_size(THUMBNAIL_SIZE)
                                .sense(egui::Sense::click()),
                        ),
                        _ => ui.add_sized(THUMBNAIL_SIZE, egui::Button::new((i + 1).to_string())),
                    },
                    ImageStatus::Loading => ui.add_sized(THUMBNAIL_SIZE, egui::Button::new((i + 1).to_string())),
                };
                let response = if i == index {
                    response.highlight()
                } else {
                    response
                };
                if response.clicked() {
                    actions.push(DetailAction::CarouselGoTo(i));
                }
            }
        });
    });
}

impl eframe::App for GlobeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;

        // Request continuous repaint for the spin and camera transitions
        ctx.request_repaint();

        self.map.advance(now.duration_since(self.started).as_secs_f64());
        // The globe is ready on the first frame
        self.viewer.handle_event(&mut self.map, MapEvent::Load);
        self.viewer.tick(&mut self.map, dt.min(Duration::from_millis(250)));
        self.handle_keys(ctx);

        egui::TopBottomPanel::top("title_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Temples of the World");
                ui.label(format!("{} temples", self.viewer.temples().len()));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙ Accessibility").clicked() {
                        self.settings_open = !self.settings_open;
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("help_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Drag: rotate | Scroll: zoom | Double-click: zoom in | Click a marker for details");
                if self.viewer.detail().current().is_some() {
                    ui.separator();
                    ui.label("←/→: previous/next temple | Esc: close");
                }
            });
        });

        if let Some(temple) = self.viewer.current_temple().cloned() {
            self.detail_panel(ctx, &temple);
        }
        self.release_stale_images();

        if self.settings_open {
            self.settings_window(ctx);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.map_panel(ui));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.viewer.teardown(&mut self.map);
        info!("Viewer closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_opens_marker_without_focus() {
        assert!(activates_marker(true, false));
        assert!(!activates_marker(false, false));
    }

    #[test]
    fn test_focused_widget_keeps_enter() {
        // e.g. right after clicking the accessibility button
        assert!(!activates_marker(true, true));
        assert!(!activates_marker(false, true));
    }
}
