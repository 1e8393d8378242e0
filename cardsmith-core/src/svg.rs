//! SVG render target
//!
//! Serializes a [`Scene`](crate::scene::Scene) into an SVG document that the
//! rasterizer hands to `usvg`. Text layout is done here (line breaks and word
//! wrap) since SVG has no automatic wrapping.

use std::fmt::Write as _;

use crate::layers::{ImageFit, TextAlign, TextWrap};
use crate::scene::{GroupNode, ImageNode, Node, Paint, PolygonNode, RectNode, RenderTarget, TextNode, VerticalAlign};
use crate::templates::Canvas;

/// Average advance of a glyph relative to the font size, used for wrapping.
const GLYPH_WIDTH_EM: f64 = 0.55;
/// Baseline offset from the top of a line box.
const ASCENT_EM: f64 = 0.8;

#[derive(Debug, Default)]
pub struct SvgTarget {
    out: String,
}

impl SvgTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(mut self) -> String {
        self.out.push_str("</svg>\n");
        self.out
    }

    fn rect(&mut self, rect: &RectNode) {
        let b = rect.bounds;
        let _ = write!(
            self.out,
            r#"<rect x="{}" y="{}" width="{}" height="{}""#,
            b.x, b.y, b.width, b.height
        );
        if rect.corner_radius > 0.0 {
            let _ = write!(self.out, r#" rx="{0}" ry="{0}""#, rect.corner_radius);
        }
        self.paint(&rect.paint);
        self.out.push_str("/>\n");
    }

    fn polygon(&mut self, polygon: &PolygonNode) {
        let points: Vec<String> = polygon
            .vertices()
            .iter()
            .map(|p| format!("{},{}", p.x, p.y))
            .collect();
        let _ = write!(self.out, r#"<polygon points="{}""#, points.join(" "));
        self.paint(&polygon.paint);
        self.out.push_str("/>\n");
    }

    fn paint(&mut self, paint: &Paint) {
        match &paint.fill {
            Some(fill) => {
                let _ = write!(self.out, r#" fill="{}""#, svg_escape(fill));
            }
            None => self.out.push_str(r#" fill="none""#),
        }
        if let Some(stroke) = &paint.stroke {
            let _ = write!(
                self.out,
                r#" stroke="{}" stroke-width="{}""#,
                svg_escape(stroke),
                paint.stroke_width
            );
        }
        if paint.opacity < 1.0 {
            let _ = write!(self.out, r#" opacity="{}""#, paint.opacity);
        }
    }

    fn image(&mut self, image: &ImageNode) {
        let b = image.bounds;
        let aspect = match image.fit {
            ImageFit::Cover => "xMidYMid slice",
            ImageFit::Contain => "xMidYMid meet",
            ImageFit::Fill | ImageFit::Stretch => "none",
        };
        let _ = write!(
            self.out,
            r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="{}""#,
            b.x, b.y, b.width, b.height, aspect
        );
        if image.opacity < 1.0 {
            let _ = write!(self.out, r#" opacity="{}""#, image.opacity);
        }
        let _ = write!(self.out, r#" xlink:href="{}"/>"#, image.asset.data_uri());
        self.out.push('\n');
    }

    fn text(&mut self, text: &TextNode) {
        let b = text.bounds;
        let lines = layout_lines(&text.text, text.font_size, b.width, text.wrap);
        if lines.is_empty() {
            return;
        }
        let advance = text.font_size * text.line_height;
        let block = advance * lines.len() as f64;
        let top = match text.vertical_align {
            VerticalAlign::Top => b.y,
            VerticalAlign::Middle => b.y + (b.height - block) / 2.0,
        };
        let (x, anchor) = match text.align {
            TextAlign::Left => (b.x, "start"),
            TextAlign::Center => (b.x + b.width / 2.0, "middle"),
            TextAlign::Right => (b.x + b.width, "end"),
        };

        let _ = write!(
            self.out,
            r#"<text font-family="{}" font-size="{}" fill="{}" text-anchor="{}""#,
            svg_escape(&text.font_family),
            text.font_size,
            svg_escape(&text.fill),
            anchor
        );
        if text.font_style.is_bold() {
            self.out.push_str(r#" font-weight="bold""#);
        }
        if text.font_style.is_italic() {
            self.out.push_str(r#" font-style="italic""#);
        }
        self.out.push('>');
        for (i, line) in lines.iter().enumerate() {
            let baseline = top + advance * i as f64 + text.font_size * ASCENT_EM;
            let _ = write!(self.out, r#"<tspan x="{}" y="{}">{}</tspan>"#, x, baseline, svg_escape(line));
        }
        self.out.push_str("</text>\n");
    }

    fn group(&mut self, group: &GroupNode) {
        let _ = writeln!(self.out, r#"<g transform="translate({} {})">"#, group.origin.x, group.origin.y);
        for child in &group.children {
            self.draw(child);
        }
        self.out.push_str("</g>\n");
    }
}

impl RenderTarget for SvgTarget {
    fn begin(&mut self, canvas: Canvas) {
        self.out.clear();
        let _ = writeln!(
            self.out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{0}" height="{1}" viewBox="0 0 {0} {1}">"#,
            canvas.width, canvas.height
        );
    }

    fn draw(&mut self, node: &Node) {
        match node {
            Node::Rect(rect) => self.rect(rect),
            Node::Text(text) => self.text(text),
            Node::Image(image) => self.image(image),
            Node::Group(group) => self.group(group),
            Node::RegularPolygon(polygon) => self.polygon(polygon),
        }
    }
}

/// Splits text into display lines: explicit newlines first, then greedy word
/// wrap against an estimated glyph width.
pub fn layout_lines(text: &str, font_size: f64, width: f64, wrap: TextWrap) -> Vec<String> {
    let max_chars = match wrap {
        TextWrap::Word if font_size > 0.0 => ((width / (font_size * GLYPH_WIDTH_EM)).floor() as usize).max(1),
        _ => usize::MAX,
    };

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if line.is_empty() { word.chars().count() } else { line.chars().count() + 1 + word.chars().count() };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Escapes markup and drops characters XML 1.0 cannot carry, so card text
/// never makes the document unparseable.
pub fn svg_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c if is_xml_char(c) => out.push(c),
            _ => {}
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Bounds, Point, Scene, SceneItem};

    #[test]
    fn test_layout_lines_breaks_and_wraps() {
        assert_eq!(layout_lines("Strike.\nDraw a card.", 10.0, 1000.0, TextWrap::Word), vec!["Strike.", "Draw a card."]);
        // ten glyphs fit in 60px at 10px
        assert_eq!(
            layout_lines("one two three four", 10.0, 60.0, TextWrap::Word),
            vec!["one two", "three four"]
        );
        assert_eq!(layout_lines("one two three four", 10.0, 60.0, TextWrap::None), vec!["one two three four"]);
        assert!(layout_lines("", 10.0, 60.0, TextWrap::Word).is_empty());
    }

    #[test]
    fn test_svg_document_escapes_text() {
        let mut scene = Scene::new(Canvas { width: 100, height: 50 });
        scene.items.push(SceneItem {
            layer_id: "t".into(),
            node: Node::Text(TextNode::new(Bounds::new(0.0, 0.0, 100.0, 50.0), "Fire & <Ice>")),
        });
        scene.items.push(SceneItem {
            layer_id: "g".into(),
            node: Node::Group(GroupNode { id: None, origin: Point::new(5.0, 6.0), children: vec![] }),
        });

        let mut target = SvgTarget::new();
        scene.paint(&mut target);
        let svg = target.finish();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 100 50""#));
        assert!(svg.contains("Fire &amp; &lt;Ice&gt;"));
        assert!(svg.contains(r#"translate(5 6)"#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_escape_drops_non_xml_characters() {
        assert_eq!(svg_escape("Axe\u{1}hand\u{1b}"), "Axehand");
        assert_eq!(svg_escape("a\tb\nc\u{FFFE}"), "a\tb\nc");
        assert_eq!(svg_escape("Fire & Ice \u{1F525}"), "Fire &amp; Ice \u{1F525}");
    }
}
