//! Cardsmith Core - Card Template Rendering Engine
//!
//! A template is a canvas plus an ordered stack of typed layers. Applied to a
//! card record, it renders either live in the editor or headlessly to PNG for
//! previews and batch export.
//!
//! # Rules
//! 1. Layer order is paint order (first = bottom)
//! 2. Resolvers are pure and shared by every render path
//! 3. Missing data degrades to a placeholder, never an error
//! 4. Every mutating edit is undoable through a snapshot
//! 5. Export skips what it cannot render and says so

pub mod card;
pub mod layers;
pub mod templates;
pub mod validation;
pub mod palette;
pub mod resolve;
pub mod scene;
pub mod assets;
pub mod compose;
pub mod svg;
pub mod raster;
pub mod history;
pub mod config;
pub mod editor;
pub mod preview;
pub mod hashing;
pub mod archive;
pub mod pipeline;
pub mod project;

pub use card::{CardData, CardField, CardId, CardType, Rarity};
pub use layers::{LayerBase, LayerKind, LayerType, TemplateLayer};
pub use templates::{Canvas, Template, TemplateError, TemplateId, TemplateLibrary, TemplatePatch};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, Validator, ViolationSeverity};
pub use palette::Palette;
pub use scene::{Node, RenderTarget, Scene};
pub use assets::{AssetError, AssetStore, ImageAsset};
pub use raster::{HeadlessRenderer, RenderError, RenderedImage};
pub use history::{History, MAX_UNDO};
pub use config::{EditorConfig, ExportConfig, GridSize};
pub use editor::{EditorError, EditorEvent, EditorSession, Modifiers};
pub use preview::{PreviewGrid, TileState};
pub use hashing::{canonical_json, compute_manifest_hash, template_fingerprint};
pub use archive::{ArchiveError, ArchiveSink, MemoryArchive, ZipSink};
pub use pipeline::{export_all, ExportError, ExportOutcome, ExportPhase, ExportPipeline, ExportProgress};
pub use project::{ProjectError, ProjectFile};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
