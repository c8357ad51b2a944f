//! Image carousel for the detail view

use std::time::Duration;

use crate::config::CarouselConfig;
use crate::dataset::Temple;

pub struct Carousel {
    images: Vec<String>,
    index: usize,
    auto_play: bool,
    interval: Duration,
    /// Time since the last automatic advance
    elapsed: Duration,
    placeholder_url: String,
}

impl Carousel {
    /// Hero image (or the derived fallback) followed by the gallery
    pub fn for_temple(temple: &Temple, config: &CarouselConfig) -> Self {
        let images = image_urls(temple, &config.fallback_base_url);
        Self {
            images,
            index: 0,
            auto_play: true,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            elapsed: Duration::ZERO,
            placeholder_url: config.placeholder_url.clone(),
        }
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &str {
        &self.images[self.index]
    }

    pub fn is_auto_playing(&self) -> bool {
        self.auto_play
    }

    /// "2 of 5"
    pub fn counter(&self) -> String {
        format!("{} of {}", self.index + 1, self.images.len())
    }

    /// Advance on the auto-play timer; true when the index moved
    pub fn tick(&mut self, dt: Duration) -> bool {
        if !self.auto_play || self.images.len() <= 1 {
            self.elapsed = Duration::ZERO;
            return false;
        }
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return false;
        }
        self.elapsed = Duration::ZERO;
        self.index = (self.index + 1) % self.images.len();
        tracing::debug!("Carousel auto-advanced to {}", self.index);
        true
    }

    pub fn next(&mut self) {
        self.index = (self.index + 1) % self.images.len();
        self.stop_auto_play();
    }

    pub fn prev(&mut self) {
        let len = self.images.len();
        self.index = (self.index + len - 1) % len;
        self.stop_auto_play();
    }

    /// Thumbnail click
    pub fn go_to(&mut self, index: usize) {
        if index < self.images.len() {
            self.index = index;
        }
        self.stop_auto_play();
    }

    pub fn toggle_auto_play(&mut self) {
        self.auto_play = !self.auto_play;
        self.elapsed = Duration::ZERO;
    }

    /// Swap a broken image for the placeholder; the index stays put
    pub fn image_failed(&mut self, index: usize) {
        if let Some(url) = self.images.get_mut(index) {
            if *url != self.placeholder_url {
                tracing::warn!("Image failed to load: {}", url);
                *url = self.placeholder_url.clone();
            }
        }
    }

    fn stop_auto_play(&mut self) {
        self.auto_play = false;
        self.elapsed = Duration::ZERO;
    }
}

/// Hero URL derived from the temple name: lowercase, whitespace runs to '-'
pub fn fallback_hero_url(name: &str, base_url: &str) -> String {
    let slug = name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
    format!("{}/{}-temple.jpg", base_url.trim_end_matches('/'), slug)
}

pub fn image_urls(temple: &Temple, fallback_base_url: &str) -> Vec<String> {
    let images = temple.images.as_ref();
    let hero = images
        .and_then(|i| i.hero.clone())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| fallback_hero_url(&temple.name, fallback_base_url));

    let mut urls = vec![hero];
    urls.extend(
        images
            .and_then(|i| i.gallery.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|u| !u.is_empty()),
    );
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{sample_temple, Images};

    fn gallery_of(n: usize) -> Carousel {
        let mut temple = sample_temple(1, "Test", 1.0, 1.0);
        temple.images = Some(Images {
            hero: Some("https://img/hero.jpg".to_string()),
            gallery: Some((1..n).map(|i| format!("https://img/{i}.jpg")).collect()),
            thumbnail: None,
        });
        Carousel::for_temple(&temple, &CarouselConfig::default())
    }

    #[test]
    fn test_three_nexts_wrap_to_start() {
        let mut carousel = gallery_of(3);
        assert!(carousel.is_auto_playing());

        carousel.next();
        assert_eq!(carousel.index(), 1);
        assert!(!carousel.is_auto_playing());

        carousel.next();
        carousel.next();
        assert_eq!(carousel.index(), 0);
    }

    #[test]
    fn test_n_nexts_is_n_mod_len() {
        for n in 0..11 {
            let mut carousel = gallery_of(4);
            for _ in 0..n {
                carousel.next();
            }
            assert_eq!(carousel.index(), n % 4);
        }
    }

    #[test]
    fn test_prev_wraps_backwards() {
        let mut carousel = gallery_of(3);
        carousel.prev();
        assert_eq!(carousel.index(), 2);
        assert_eq!(carousel.counter(), "3 of 3");
    }

    #[test]
    fn test_auto_play_every_interval() {
        let mut carousel = gallery_of(2);
        assert!(!carousel.tick(Duration::from_secs(7)));
        assert!(carousel.tick(Duration::from_secs(1)));
        assert_eq!(carousel.index(), 1);
        assert!(!carousel.tick(Duration::from_secs(4)));
        assert!(carousel.tick(Duration::from_secs(4)));
        assert_eq!(carousel.index(), 0);
    }

    #[test]
    fn test_explicit_navigation_stops_auto_play() {
        let mut carousel = gallery_of(3);
        carousel.go_to(2);
        assert!(!carousel.tick(Duration::from_secs(60)));
        assert_eq!(carousel.index(), 2);

        carousel.toggle_auto_play();
        assert!(carousel.tick(Duration::from_secs(8)));
        assert_eq!(carousel.index(), 0);
    }

    #[test]
    fn test_single_image_never_auto_advances() {
        let carousel_temple = sample_temple(9, "Lone", 1.0, 1.0);
        let mut carousel = Carousel::for_temple(&carousel_temple, &CarouselConfig::default());
        assert_eq!(carousel.images().len(), 1);
        assert!(!carousel.tick(Duration::from_secs(100)));
    }

    #[test]
    fn test_fallback_hero_from_name() {
        let temple = sample_temple(1, "Salt  Lake\tCity", 1.0, 1.0);
        let urls = image_urls(&temple, "https://churchofjesuschrist.org/imgs/temples/");
        assert_eq!(urls, vec!["https://churchofjesuschrist.org/imgs/temples/salt-lake-city-temple.jpg".to_string()]);
    }

    #[test]
    fn test_failed_image_becomes_placeholder_without_moving() {
        let mut carousel = gallery_of(3);
        carousel.next();
        carousel.image_failed(1);

        assert_eq!(carousel.index(), 1);
        assert_eq!(carousel.current(), CarouselConfig::default().placeholder_url);
        assert_eq!(carousel.images()[0], "https://img/hero.jpg");
    }
}
