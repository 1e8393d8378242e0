//! Headless Renderer - one-shot rasterization of a card to PNG
//!
//! Every call builds its own scene, SVG document and pixmap; only the font
//! database is shared, read-only, so renders of different cards may run on
//! different threads.

use std::sync::{Arc, Once};
use thiserror::Error;
use tiny_skia::Pixmap;
use usvg::fontdb::{Database, Family, Query};

use crate::assets::AssetStore;
use crate::card::CardData;
use crate::compose::{compose_scene, LayerContext};
use crate::palette::Palette;
use crate::scene::{Scene, DEFAULT_FONT_FAMILY};
use crate::svg::SvgTarget;
use crate::templates::{Canvas, Template};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Canvas {0}x{1} cannot be allocated")]
    Canvas(u32, u32),

    #[error("SVG parse error: {0}")]
    Svg(#[from] usvg::Error),

    #[error("PNG encode error: {0}")]
    Encode(#[from] png::EncodingError),
}

/// A rendered card: PNG bytes of exactly the template's canvas size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

#[derive(Clone)]
pub struct HeadlessRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl HeadlessRenderer {
    /// A renderer with no fonts loaded. Text layers produce no pixels.
    pub fn new() -> Self {
        Self { fontdb: Arc::new(usvg::fontdb::Database::new()) }
    }

    /// Loads the host's fonts. When the generic sans-serif family is not
    /// installed it is remapped onto a face that is.
    pub fn with_system_fonts() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        log::debug!("loaded {} system font faces", fontdb.len());
        map_sans_serif(&mut fontdb);
        Self { fontdb: Arc::new(fontdb) }
    }

    /// Loads one font file and maps the generic sans-serif family onto it.
    pub fn with_font_data(font: Vec<u8>) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_font_data(font);
        if let Some(name) = first_family(&fontdb) {
            fontdb.set_sans_serif_family(name);
        }
        Self { fontdb: Arc::new(fontdb) }
    }

    pub fn has_fonts(&self) -> bool {
        !self.fontdb.is_empty()
    }

    /// Renders `card` through `template`. Missing images become placeholders;
    /// a degenerate template renders a blank canvas.
    pub fn render_card(
        &self,
        card: &CardData,
        template: &Template,
        palette: &Palette,
        assets: &AssetStore,
    ) -> Result<RenderedImage, RenderError> {
        let ctx = LayerContext::new(template, palette, assets, Some(card));
        let scene = compose_scene(template, &ctx);
        log::debug!(
            "rendering \"{}\" with template \"{}\" ({} of {} layers)",
            card.name,
            template.name,
            scene.items.len(),
            template.layers.len()
        );
        self.render_scene(&scene)
    }

    pub fn render_scene(&self, scene: &Scene) -> Result<RenderedImage, RenderError> {
        let Canvas { width, height } = scene.canvas;
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Canvas(width, height))?;

        if !scene.items.is_empty() {
            if self.fontdb.is_empty() && scene.items.iter().any(|item| item.node.find_text().is_some()) {
                NO_FONTS.call_once(|| log::warn!("no fonts loaded; text layers will not be drawn"));
            }

            let mut target = SvgTarget::new();
            scene.paint(&mut target);
            let svg = target.finish();

            let mut opt = usvg::Options::default();
            opt.font_family = DEFAULT_FONT_FAMILY.to_string();
            opt.fontdb = Arc::clone(&self.fontdb);
            let tree = usvg::Tree::from_str(&svg, &opt)?;
            resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
        }

        Ok(RenderedImage { width, height, png: encode_png(&pixmap)? })
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::with_system_fonts()
    }
}

static NO_FONTS: Once = Once::new();

/// Installed sans faces tried, in order, when the default sans-serif family
/// is missing.
const SANS_FALLBACKS: [&str; 4] = ["DejaVu Sans", "Liberation Sans", "Noto Sans", "FreeSans"];

fn map_sans_serif(fontdb: &mut Database) {
    let query = Query { families: &[Family::SansSerif], ..Query::default() };
    if fontdb.query(&query).is_some() {
        return;
    }

    let installed = |name: &str| fontdb.faces().any(|face| face.families.iter().any(|(n, _)| n == name));
    let family = SANS_FALLBACKS
        .into_iter()
        .find(|&name| installed(name))
        .map(str::to_string)
        .or_else(|| first_family(&*fontdb));

    match family {
        Some(name) => {
            log::debug!("mapping sans-serif onto \"{}\"", name);
            fontdb.set_sans_serif_family(name);
        }
        None => log::warn!("no usable font faces found; text layers will not be drawn"),
    }
}

fn first_family(fontdb: &Database) -> Option<String> {
    fontdb
        .faces()
        .next()
        .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
}

/// Straight-alpha RGBA PNG from a premultiplied pixmap.
fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, png::EncodingError> {
    let data: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Default);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&data)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{tests::solid_png, ImageAsset};
    use crate::card::{CardType, Rarity};
    use crate::layers::{LayerKind, LayerType, TemplateLayer};

    fn decode(png_bytes: &[u8]) -> (u32, u32, Vec<u8>) {
        let decoder = png::Decoder::new(png_bytes);
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        buf.truncate(info.buffer_size());
        (info.width, info.height, buf)
    }

    fn card() -> CardData {
        CardData::new("c1", "Axehand", "Warrior", CardType::Slayer, Rarity::Common)
    }

    fn background(fill: &str) -> TemplateLayer {
        let mut layer = TemplateLayer::with_defaults(LayerType::Rect);
        layer.base.width = 40.0;
        layer.base.height = 30.0;
        if let LayerKind::Rect(rect) = &mut layer.kind {
            rect.fill = Some(fill.to_string());
        }
        layer
    }

    fn template(width: u32, height: u32) -> Template {
        let mut t = Template::blank("Raster");
        t.canvas = Canvas { width, height };
        t
    }

    #[test]
    fn test_output_matches_canvas_and_fill() {
        let mut t = template(40, 30);
        t.layers.push(background("#222222"));
        let image = HeadlessRenderer::new()
            .render_card(&card(), &t, &Palette::starter(), &AssetStore::new())
            .unwrap();

        let (w, h, pixels) = decode(&image.png);
        assert_eq!((w, h), (40, 30));
        assert_eq!((image.width, image.height), (40, 30));
        assert_eq!(&pixels[0..4], &[0x22, 0x22, 0x22, 0xff]);
    }

    #[test]
    fn test_empty_template_renders_blank_canvas() {
        let image = HeadlessRenderer::new()
            .render_card(&card(), &template(8, 6), &Palette::starter(), &AssetStore::new())
            .unwrap();
        let (w, h, pixels) = decode(&image.png);
        assert_eq!((w, h), (8, 6));
        assert!(pixels.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_frame_image_is_drawn() {
        let mut t = template(10, 10);
        let mut frame = TemplateLayer::with_defaults(LayerType::Image);
        frame.base.width = 10.0;
        frame.base.height = 10.0;
        t.layers.push(frame);

        let mut assets = AssetStore::new();
        assets.insert_frame(t.id.clone(), ImageAsset::from_png(solid_png(10, 10, [0, 0, 255, 255])).unwrap());
        let image = HeadlessRenderer::new()
            .render_card(&card(), &t, &Palette::starter(), &assets)
            .unwrap();

        let (_, _, pixels) = decode(&image.png);
        let centre = (5 * 10 + 5) * 4;
        assert_eq!(&pixels[centre..centre + 4], &[0, 0, 255, 255]);
    }

    fn name_banner() -> Template {
        serde_json::from_str(
            r##"{
                "id": "banner",
                "name": "Banner",
                "cardTypes": ["Slayer"],
                "canvas": { "width": 120, "height": 60 },
                "layers": [
                    { "id": "bg", "type": "rect", "x": 0, "y": 0, "width": 120, "height": 60, "fill": "#ffffff" },
                    { "id": "name", "type": "text", "x": 0, "y": 0, "width": 120, "height": 60,
                      "field": "name", "fontSize": 40, "fill": "#000000" }
                ]
            }"##,
        )
        .unwrap()
    }

    fn dark_pixels(png_bytes: &[u8]) -> usize {
        let (_, _, pixels) = decode(png_bytes);
        pixels.chunks(4).filter(|p| p[0] < 128 && p[1] < 128 && p[2] < 128).count()
    }

    #[test]
    fn test_system_fonts_draw_default_family_text() {
        let renderer = HeadlessRenderer::default();
        if !renderer.has_fonts() {
            // Host without any installed fonts.
            return;
        }
        let card = CardData::new("c1", "WWWWW", "Warrior", CardType::Slayer, Rarity::Common);
        let image = renderer.render_card(&card, &name_banner(), &Palette::starter(), &AssetStore::new()).unwrap();
        assert!(dark_pixels(&image.png) > 0);
    }

    #[test]
    fn test_control_characters_still_render() {
        let card = CardData::new("c1", "Axe\u{1}hand", "Warrior", CardType::Slayer, Rarity::Common);
        let image = HeadlessRenderer::new()
            .render_card(&card, &name_banner(), &Palette::starter(), &AssetStore::new())
            .unwrap();
        assert_eq!((image.width, image.height), (120, 60));
    }

    #[test]
    fn test_missing_art_renders_placeholder_block() {
        let mut t = template(10, 10);
        let mut art = TemplateLayer::with_defaults(LayerType::Image);
        art.base.width = 10.0;
        art.base.height = 10.0;
        if let LayerKind::Image(image) = &mut art.kind {
            image.image_source = crate::layers::ImageSource::Art;
        }
        t.layers.push(art);

        let image = HeadlessRenderer::new()
            .render_card(&card(), &t, &Palette::starter(), &AssetStore::new())
            .unwrap();
        let (_, _, pixels) = decode(&image.png);
        assert_eq!(&pixels[0..4], &[0x88, 0x88, 0x88, 0xff]);
    }
}
