//! Cardsmith CLI - headless rendering of a project file
//!
//! Commands: templates, validate, render, export, import-template, export-template
//! Outputs JSON to stdout
//! Returns non-zero on failure

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cardsmith_core::{
    pipeline::Catalogue,
    ExportPipeline, HeadlessRenderer, ProjectFile, TemplateLibrary, Validator, ZipSink,
};

#[derive(Parser)]
#[command(name = "cardsmith-cli")]
#[command(about = "Cardsmith CLI - card template renderer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the project file
    #[arg(short, long, default_value = "project.json")]
    project: PathBuf,

    /// Log render details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List templates in the project
    Templates,

    /// Validate a template
    Validate {
        /// Template ID
        #[arg(short, long)]
        template: String,
    },

    /// Render one card to PNG
    Render {
        /// Card ID
        #[arg(short, long)]
        card: String,

        /// Template ID (defaults to the first template for the card's type)
        #[arg(short, long)]
        template: Option<String>,

        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Render every card into a ZIP archive
    Export {
        /// Output ZIP path
        #[arg(short, long)]
        out: PathBuf,

        /// Catalogue document to pack alongside the images
        #[arg(short, long)]
        catalogue: Option<PathBuf>,
    },

    /// Import a template JSON file into the project
    ImportTemplate {
        /// Template JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print a template as JSON
    ExportTemplate {
        /// Template ID
        #[arg(short, long)]
        template: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Load project
    let project = match ProjectFile::load(&cli.project) {
        Ok(p) => p,
        Err(e) => {
            fail(format!("Failed to load project: {}", e));
            return ExitCode::FAILURE;
        }
    };
    let base_dir = cli.project.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    match cli.command {
        Commands::Templates => {
            let templates: Vec<_> = project.templates
                .iter()
                .map(|t| serde_json::json!({
                    "id": t.id,
                    "name": t.name,
                    "cardTypes": t.card_types,
                    "canvas": t.canvas,
                    "layers": t.layers.len(),
                }))
                .collect();

            print_json(&templates);
            ExitCode::SUCCESS
        }

        Commands::Validate { template } => {
            let Some(template) = project.templates.iter().find(|t| t.id == template) else {
                fail(format!("Template not found: {}", template));
                return ExitCode::FAILURE;
            };

            let result = Validator::new().validate(template);
            print_json(&result);
            if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)  // Validation failure
            }
        }

        Commands::Render { card, template, out } => {
            let Some(card) = project.cards.iter().find(|c| c.id == card) else {
                fail(format!("Card not found: {}", card));
                return ExitCode::FAILURE;
            };

            let library = TemplateLibrary::from_templates(project.templates.clone());
            let template = match &template {
                Some(id) => library.get(id),
                None => library.find_for(card.card_type),
            };
            let Some(template) = template else {
                fail(format!("No template for card \"{}\"", card.name));
                return ExitCode::FAILURE;
            };

            let assets = project.load_assets(&base_dir);
            let renderer = HeadlessRenderer::with_system_fonts();
            let image = match renderer.render_card(card, template, &project.palette, &assets) {
                Ok(image) => image,
                Err(e) => {
                    fail(format!("Render failed: {}", e));
                    return ExitCode::from(2);
                }
            };

            if let Err(e) = fs::write(&out, &image.png) {
                fail(format!("Failed to write {}: {}", out.display(), e));
                return ExitCode::FAILURE;
            }

            print_json(&serde_json::json!({
                "success": true,
                "card": card.id,
                "template": template.id,
                "width": image.width,
                "height": image.height,
                "path": out,
            }));
            ExitCode::SUCCESS
        }

        Commands::Export { out, catalogue } => {
            let catalogue = match catalogue {
                Some(path) => match fs::read(&path) {
                    Ok(bytes) => Some(Catalogue {
                        name: path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
                        bytes,
                    }),
                    Err(e) => {
                        fail(format!("Failed to read catalogue: {}", e));
                        return ExitCode::FAILURE;
                    }
                },
                None => None,
            };

            let assets = project.load_assets(&base_dir);
            let pipeline = ExportPipeline::new(HeadlessRenderer::with_system_fonts(), project.export.clone());
            let outcome = pipeline.export_all(
                &project.cards,
                &project.templates,
                &project.palette,
                &assets,
                catalogue.as_ref(),
                ZipSink::new(),
                |p| log::debug!("{:?} {}/{}", p.phase, p.current, p.total),
            );

            match outcome {
                Ok(outcome) => {
                    if let Err(e) = fs::write(&out, &outcome.archive) {
                        fail(format!("Failed to write {}: {}", out.display(), e));
                        return ExitCode::FAILURE;
                    }
                    print_json(&serde_json::json!({
                        "success": true,
                        "path": out,
                        "manifest": outcome.manifest,
                    }));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    fail(format!("Export failed: {}", e));
                    ExitCode::FAILURE
                }
            }
        }

        Commands::ImportTemplate { file } => {
            let json = match fs::read_to_string(&file) {
                Ok(json) => json,
                Err(e) => {
                    fail(format!("Failed to read {}: {}", file.display(), e));
                    return ExitCode::FAILURE;
                }
            };

            let mut library = TemplateLibrary::from_templates(project.templates.clone());
            let id = match library.import_json(&json) {
                Ok(id) => id,
                Err(e) => {
                    fail(e.to_string());
                    return ExitCode::from(2);
                }
            };

            let project = ProjectFile { templates: library.into_templates(), ..project };
            if let Err(e) = project.save(&cli.project) {
                fail(format!("Failed to save project: {}", e));
                return ExitCode::FAILURE;
            }
            print_json(&serde_json::json!({ "success": true, "id": id }));
            ExitCode::SUCCESS
        }

        Commands::ExportTemplate { template } => {
            let library = TemplateLibrary::from_templates(project.templates);
            match library.export_json(&template) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    fail(e.to_string());
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(format!("Serialization error: {}", e)),
    }
}

fn fail(message: String) {
    println!("{}", serde_json::json!({ "success": false, "error": message }));
}
