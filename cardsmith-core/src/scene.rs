//! Render Target Abstraction
//!
//! Five primitive node kinds that both renderers draw: rectangles, text,
//! images, groups and regular polygons. Layer composition builds trees of
//! [`Node`]s once; the editor stage hit-tests them and the rasterizer paints
//! them through a [`RenderTarget`].

use crate::assets::ImageAsset;
use crate::layers::{FontStyle, ImageFit, TextAlign, TextWrap};
use crate::templates::Canvas;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }

    pub fn union(&self, other: &Bounds) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Self { x, y, width: right - x, height: bottom - y }
    }
}

/// Fill, stroke and opacity shared by the shape primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Paint {
    pub fn fill(color: impl Into<String>) -> Self {
        Self { fill: Some(color.into()), ..Self::default() }
    }

    pub fn with_stroke(mut self, stroke: Option<String>, width: Option<f64>) -> Self {
        self.stroke = stroke;
        self.stroke_width = width.unwrap_or(1.0);
        self
    }

    pub fn with_opacity(mut self, opacity: Option<f64>) -> Self {
        self.opacity = opacity.unwrap_or(1.0);
        self
    }
}

impl Default for Paint {
    fn default() -> Self {
        Self { fill: None, stroke: None, stroke_width: 1.0, opacity: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RectNode {
    pub id: Option<String>,
    pub bounds: Bounds,
    pub corner_radius: f64,
    pub paint: Paint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub id: Option<String>,
    pub bounds: Bounds,
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub font_style: FontStyle,
    pub fill: String,
    pub align: TextAlign,
    pub vertical_align: VerticalAlign,
    pub line_height: f64,
    pub wrap: TextWrap,
}

impl TextNode {
    pub fn new(bounds: Bounds, text: impl Into<String>) -> Self {
        Self {
            id: None,
            bounds,
            text: text.into(),
            font_size: 12.0,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_style: FontStyle::Normal,
            fill: "#ffffff".to_string(),
            align: TextAlign::Left,
            vertical_align: VerticalAlign::Top,
            line_height: 1.0,
            wrap: TextWrap::Word,
        }
    }
}

pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

#[derive(Debug, Clone, PartialEq)]
pub struct ImageNode {
    pub id: Option<String>,
    pub bounds: Bounds,
    pub asset: ImageAsset,
    pub fit: ImageFit,
    pub opacity: f64,
}

/// A translated container. Children are positioned relative to `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub id: Option<String>,
    pub origin: Point,
    pub children: Vec<Node>,
}

/// Regular polygon centred on `center`, first vertex pointing up.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonNode {
    pub id: Option<String>,
    pub center: Point,
    pub sides: u32,
    pub radius: f64,
    pub paint: Paint,
}

impl PolygonNode {
    pub fn vertices(&self) -> Vec<Point> {
        (0..self.sides)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * f64::from(i) / f64::from(self.sides);
                Point::new(
                    self.center.x + self.radius * angle.sin(),
                    self.center.y - self.radius * angle.cos(),
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rect(RectNode),
    Text(TextNode),
    Image(ImageNode),
    Group(GroupNode),
    RegularPolygon(PolygonNode),
}

impl Node {
    pub fn id(&self) -> Option<&str> {
        match self {
            Node::Rect(n) => n.id.as_deref(),
            Node::Text(n) => n.id.as_deref(),
            Node::Image(n) => n.id.as_deref(),
            Node::Group(n) => n.id.as_deref(),
            Node::RegularPolygon(n) => n.id.as_deref(),
        }
    }

    /// Extent in the parent's coordinates. Empty groups have none.
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Node::Rect(n) => Some(n.bounds),
            Node::Text(n) => Some(n.bounds),
            Node::Image(n) => Some(n.bounds),
            Node::RegularPolygon(n) => Some(Bounds::new(
                n.center.x - n.radius,
                n.center.y - n.radius,
                n.radius * 2.0,
                n.radius * 2.0,
            )),
            Node::Group(n) => n
                .children
                .iter()
                .filter_map(Node::bounds)
                .reduce(|a, b| a.union(&b))
                .map(|b| b.translate(n.origin.x, n.origin.y)),
        }
    }

    /// Depth-first search for the first text node, used by tests and previews.
    pub fn find_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            Node::Group(g) => g.children.iter().find_map(Node::find_text),
            _ => None,
        }
    }
}

/// A composed layer: the node tree for one template layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    pub layer_id: String,
    pub node: Node,
}

/// Everything to paint for one template, bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub canvas: Canvas,
    pub items: Vec<SceneItem>,
}

impl Scene {
    pub fn new(canvas: Canvas) -> Self {
        Self { canvas, items: vec![] }
    }

    pub fn item(&self, layer_id: &str) -> Option<&SceneItem> {
        self.items.iter().find(|i| i.layer_id == layer_id)
    }

    pub fn paint<T: RenderTarget + ?Sized>(&self, target: &mut T) {
        target.begin(self.canvas);
        for item in &self.items {
            target.draw(&item.node);
        }
    }
}

/// The interface a renderer backend draws against.
pub trait RenderTarget {
    fn begin(&mut self, canvas: Canvas);

    fn draw(&mut self, node: &Node);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_bounds_are_translated_union() {
        let rect = |x, y| {
            Node::Rect(RectNode {
                id: None,
                bounds: Bounds::new(x, y, 10.0, 10.0),
                corner_radius: 0.0,
                paint: Paint::default(),
            })
        };
        let group = Node::Group(GroupNode {
            id: Some("g".into()),
            origin: Point::new(100.0, 50.0),
            children: vec![rect(0.0, 0.0), rect(20.0, 5.0)],
        });
        assert_eq!(group.bounds(), Some(Bounds::new(100.0, 50.0, 30.0, 15.0)));

        let empty = Node::Group(GroupNode { id: None, origin: Point::default(), children: vec![] });
        assert_eq!(empty.bounds(), None);
    }

    #[test]
    fn test_diamond_vertices_start_at_top() {
        let diamond = PolygonNode {
            id: None,
            center: Point::new(40.0, 40.0),
            sides: 4,
            radius: 20.0,
            paint: Paint::default(),
        };
        let v = diamond.vertices();
        assert_eq!(v.len(), 4);
        assert!((v[0].x - 40.0).abs() < 1e-9 && (v[0].y - 20.0).abs() < 1e-9);
        assert!((v[1].x - 60.0).abs() < 1e-9 && (v[1].y - 40.0).abs() < 1e-9);
    }
}
