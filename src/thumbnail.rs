use eframe::egui::ColorImage;

/// Downloads and decodes the thumbnail the metadata endpoint pointed at.
/// Returns `None` on any failure; the panel then shows the alt text.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    if url.is_empty() {
        return None;
    }
    // Blocking GET; callers run this on the runtime's blocking pool
    let resp = match reqwest::blocking::get(url).and_then(|r| r.error_for_status()) {
        Ok(resp) => resp.bytes().ok()?,
        Err(e) => {
            tracing::debug!("thumbnail fetch failed for {}: {}", url, e);
            return None;
        }
    };
    decode_thumbnail(&resp)
}

/// Turns encoded image bytes into an egui image
pub fn decode_thumbnail(bytes: &[u8]) -> Option<ColorImage> {
    let img = image::load_from_memory(bytes).ok()?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}

/// Thumbnail of the card on screen. Only one URL is held at a time, so a
/// new video or a reset releases the previous image.
#[derive(Debug)]
pub struct ThumbnailCache<T> {
    /// URL being shown (fetched or still in flight)
    current: Option<String>,
    image: Option<T>,
}

impl<T> Default for ThumbnailCache<T> {
    fn default() -> Self {
        Self {
            current: None,
            image: None,
        }
    }
}

impl<T> ThumbnailCache<T> {
    /// Switches to `url`; true when the caller should start a fetch
    pub fn want(&mut self, url: &str) -> bool {
        if self.current.as_deref() == Some(url) {
            return false;
        }
        self.current = Some(url.to_string());
        self.image = None;
        true
    }

    /// Stores a finished fetch; results for a URL no longer shown are dropped
    pub fn fulfil(&mut self, url: &str, image: T) {
        if self.current.as_deref() == Some(url) {
            self.image = Some(image);
        }
    }

    pub fn get(&self, url: &str) -> Option<&T> {
        match self.current.as_deref() {
            Some(current) if current == url => self.image.as_ref(),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.image = None;
    }
}
