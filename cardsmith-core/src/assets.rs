//! Image assets: decoded-once PNG frames and card art
//!
//! Frames are keyed by template id and art by card name. The store remembers
//! misses too, so an absent file is looked up once and then renders as a
//! placeholder without further I/O.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Image decode error: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("Image has no pixels")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A loaded PNG. Cloning shares the encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub width: u32,
    pub height: u32,
    png: Arc<[u8]>,
}

impl ImageAsset {
    /// Validates the PNG header and keeps the encoded bytes for the renderers.
    pub fn from_png(bytes: Vec<u8>) -> Result<Self, AssetError> {
        let decoder = png::Decoder::new(bytes.as_slice());
        let (width, height) = {
            let reader = decoder.read_info()?;
            let info = reader.info();
            (info.width, info.height)
        };
        if width == 0 || height == 0 {
            return Err(AssetError::Empty);
        }
        Ok(Self { width, height, png: bytes.into() })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Load-once cache of frame and art images.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    frames: HashMap<String, Option<ImageAsset>>,
    art: HashMap<String, Option<ImageAsset>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_frame(&mut self, template_id: impl Into<String>, asset: ImageAsset) {
        self.frames.insert(template_id.into(), Some(asset));
    }

    pub fn insert_art(&mut self, card_name: impl Into<String>, asset: ImageAsset) {
        self.art.insert(card_name.into(), Some(asset));
    }

    pub fn frame(&self, template_id: &str) -> Option<&ImageAsset> {
        self.frames.get(template_id).and_then(Option::as_ref)
    }

    pub fn art(&self, card_name: &str) -> Option<&ImageAsset> {
        self.art.get(card_name).and_then(Option::as_ref)
    }

    /// Returns the cached frame, running `load` only on the first request for
    /// `template_id`. A failed or empty load is cached as a miss.
    pub fn load_frame<F>(&mut self, template_id: &str, load: F) -> Option<&ImageAsset>
    where
        F: FnOnce() -> Result<Option<Vec<u8>>, AssetError>,
    {
        load_once(&mut self.frames, template_id, load)
    }

    pub fn load_art<F>(&mut self, card_name: &str, load: F) -> Option<&ImageAsset>
    where
        F: FnOnce() -> Result<Option<Vec<u8>>, AssetError>,
    {
        load_once(&mut self.art, card_name, load)
    }

    pub fn len(&self) -> usize {
        self.frames.values().chain(self.art.values()).filter(|a| a.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load_once<'a, F>(
    cache: &'a mut HashMap<String, Option<ImageAsset>>,
    key: &str,
    load: F,
) -> Option<&'a ImageAsset>
where
    F: FnOnce() -> Result<Option<Vec<u8>>, AssetError>,
{
    if !cache.contains_key(key) {
        let asset = match load().and_then(|bytes| bytes.map(ImageAsset::from_png).transpose()) {
            Ok(asset) => asset,
            Err(e) => {
                log::warn!("could not load image for \"{}\": {}", key, e);
                None
            }
        };
        cache.insert(key.to_string(), asset);
    }
    cache.get(key).and_then(Option::as_ref)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;

    /// Encodes a solid-colour RGBA PNG.
    pub(crate) fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            let data: Vec<u8> = rgba.iter().copied().cycle().take((width * height * 4) as usize).collect();
            writer.write_image_data(&data).unwrap();
        }
        out
    }

    #[test]
    fn test_from_png_reads_dimensions() {
        let asset = ImageAsset::from_png(solid_png(3, 2, [255, 0, 0, 255])).unwrap();
        assert_eq!((asset.width, asset.height), (3, 2));
        assert!(asset.data_uri().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_from_png_rejects_garbage() {
        assert!(matches!(ImageAsset::from_png(b"not a png".to_vec()), Err(AssetError::Decode(_))));
    }

    #[test]
    fn test_load_once_caches_hits_and_misses() {
        let mut store = AssetStore::new();
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(Some(solid_png(1, 1, [0, 0, 0, 255])))
        };
        assert!(store.load_art("Axehand", load).is_some());
        assert!(store.load_art("Axehand", load).is_some());
        assert_eq!(calls.get(), 1);

        let miss = || {
            calls.set(calls.get() + 1);
            Ok(None)
        };
        assert!(store.load_frame("t1", miss).is_none());
        assert!(store.load_frame("t1", miss).is_none());
        assert_eq!(calls.get(), 2);

        assert!(store.load_frame("t2", || Ok(Some(b"junk".to_vec()))).is_none());
        assert!(store.frame("t2").is_none());
        assert_eq!(store.len(), 1);
    }
}
