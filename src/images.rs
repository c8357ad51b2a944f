//! Remote carousel images
//!
//! Fetches run on the tokio runtime; decoded pixels are handed back to
//! the UI thread, which uploads them as egui textures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// What the UI can draw for a URL right now
pub enum ImageStatus<'a> {
    Loading,
    Ready(&'a egui::TextureHandle),
    Failed,
}

enum Fetch {
    Pending,
    Decoded(egui::ColorImage),
    Failed,
}

enum Slot {
    Loading,
    Ready(egui::TextureHandle),
    Failed,
}

pub struct ImageCache {
    runtime: Handle,
    client: reqwest::Client,
    fetches: Arc<Mutex<HashMap<String, Fetch>>>,
    slots: HashMap<String, Slot>,
}

impl ImageCache {
    pub fn new(runtime: Handle, user_agent: &str) -> Self {
        Self {
            runtime,
            client: build_client(user_agent),
            fetches: Arc::new(Mutex::new(HashMap::new())),
            slots: HashMap::new(),
        }
    }

    /// Look up `url`, starting a fetch on first use
    pub fn get(&mut self, ctx: &egui::Context, url: &str) -> ImageStatus<'_> {
        if !self.slots.contains_key(url) {
            self.start_fetch(ctx, url);
            self.slots.insert(url.to_string(), Slot::Loading);
        }

        if matches!(self.slots.get(url), Some(Slot::Loading)) {
            if let Some(next) = self.collect(ctx, url) {
                self.slots.insert(url.to_string(), next);
            }
        }

        match self.slots.get(url) {
            Some(Slot::Ready(texture)) => ImageStatus::Ready(texture),
            Some(Slot::Failed) => ImageStatus::Failed,
            _ => ImageStatus::Loading,
        }
    }

    /// Evict every URL not in `keep`, along with its texture
    pub fn retain(&mut self, keep: &[String]) {
        let before = self.slots.len();
        self.slots.retain(|url, _| keep.contains(url));
        if let Ok(mut fetches) = self.fetches.lock() {
            fetches.retain(|url, _| keep.contains(url));
        }
        tracing::debug!("Image cache: evicted {}, kept {}", before - self.slots.len(), self.slots.len());
    }

    fn start_fetch(&self, ctx: &egui::Context, url: &str) {
        if let Ok(mut fetches) = self.fetches.lock() {
            fetches.insert(url.to_string(), Fetch::Pending);
        }

        let client = self.client.clone();
        let fetches = Arc::clone(&self.fetches);
        let ctx = ctx.clone();
        let url = url.to_string();
        tracing::debug!("Fetching image {}", url);

        self.runtime.spawn(async move {
            let result = match fetch_image(&client, &url).await {
                Ok(image) => Fetch::Decoded(image),
                Err(e) => {
                    tracing::warn!("Image {} unavailable: {}", url, e);
                    Fetch::Failed
                }
            };
            if let Ok(mut fetches) = fetches.lock() {
                fetches.insert(url, result);
            }
            ctx.request_repaint();
        });
    }

    /// Move a finished fetch into a texture slot
    fn collect(&self, ctx: &egui::Context, url: &str) -> Option<Slot> {
        let mut fetches = self.fetches.lock().ok()?;
        match fetches.get(url)? {
            Fetch::Pending => None,
            Fetch::Failed => {
                fetches.remove(url);
                Some(Slot::Failed)
            }
            Fetch::Decoded(_) => match fetches.remove(url) {
                Some(Fetch::Decoded(image)) => {
                    let texture = ctx.load_texture(url, image, egui::TextureOptions::LINEAR);
                    Some(Slot::Ready(texture))
                }
                _ => None,
            },
        }
    }
}

/// Client with the configured User-Agent; a plain client if the builder fails
fn build_client(user_agent: &str) -> reqwest::Client {
    match reqwest::Client::builder()
        .user_agent(user_agent.to_string())
        .timeout(Duration::from_secs(20))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Image client setup failed ({}), using defaults without User-Agent", e);
            reqwest::Client::new()
        }
    }
}

async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<egui::ColorImage, ImageError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(ImageError::Status(response.status()));
    }
    let bytes = response.bytes().await?;
    decode(&bytes)
}

pub fn decode(bytes: &[u8]) -> Result<egui::ColorImage, ImageError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}
