//! SCodes CLI - Barcode Image Generator
//!
//! Commands: formats, generate
//! Outputs JSON to stdout, logs to stderr
//! Returns non-zero on failure

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

use scodes_core::{
    symbology, Color, Generator, GeneratorSettings, MatrixEncoder, StandardEncoder, Symbology,
};

#[derive(Parser)]
#[command(name = "scodes-cli")]
#[command(about = "SCodes CLI - barcode and QR code image generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON settings file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List symbologies that can be generated
    Formats,

    /// Generate a barcode image
    Generate {
        /// Text to encode
        text: String,

        #[command(flatten)]
        overrides: Overrides,

        /// Also copy the image into this documents directory
        #[arg(long)]
        export_to: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Overrides {
    /// Symbology name, e.g. QRCode, Code128, EAN-13
    #[arg(short, long)]
    format: Option<String>,

    /// Image width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Quiet zone in modules
    #[arg(long)]
    margin: Option<u32>,

    /// Error correction level, 0-8
    #[arg(long)]
    ecc: Option<u8>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output file name without extension
    #[arg(long)]
    file_name: Option<String>,

    /// Output extension; empty for none
    #[arg(long)]
    extension: Option<String>,

    /// Image drawn in the middle of QR codes
    #[arg(long)]
    center_image: Option<PathBuf>,

    /// How many times smaller than the code the center panel is
    #[arg(long)]
    center_image_ratio: Option<u32>,

    /// Dark module color (name, #rrggbb or #aarrggbb)
    #[arg(long)]
    foreground: Option<Color>,

    /// Light module color (name, #rrggbb or #aarrggbb)
    #[arg(long)]
    background: Option<Color>,
}

impl Overrides {
    fn apply(self, settings: &mut GeneratorSettings) -> Result<(), String> {
        if let Some(name) = self.format {
            settings.format = symbology::resolve(symbology::parse(&name))
                .map_err(|e| format!("{} ({})", e, name))?;
        }
        if let Some(v) = self.width { settings.image_width = v; }
        if let Some(v) = self.height { settings.image_height = v; }
        if let Some(v) = self.margin { settings.image_margin = v; }
        if let Some(v) = self.ecc { settings.ecc_level = Some(v); }
        if let Some(v) = self.output_dir { settings.file_path = v; }
        if let Some(v) = self.file_name { settings.file_name = v; }
        if let Some(v) = self.extension { settings.file_extension = v; }
        if let Some(v) = self.center_image { settings.center_image = Some(v); }
        if let Some(v) = self.center_image_ratio { settings.center_image_ratio = v; }
        if let Some(v) = self.foreground { settings.foreground_color = v; }
        if let Some(v) = self.background { settings.background_color = v; }
        Ok(())
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => println!(r#"{{"success": false, "error": "Failed to serialize output: {}"}}"#, e),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => match GeneratorSettings::load(path) {
            Ok(s) => s,
            Err(e) => {
                print_json(&json!({"success": false, "stage": "validating", "error": e.to_string()}));
                return ExitCode::FAILURE;
            }
        },
        None => GeneratorSettings::default(),
    };

    match cli.command {
        Commands::Formats => {
            let encoder = StandardEncoder::new();
            let formats: Vec<_> = Symbology::ALL
                .iter()
                .map(|&s| json!({
                    "name": s.name(),
                    "kind": if s.is_one_d() { "1d" } else { "2d" },
                    "supported": encoder.supports(s),
                    "ecc_range": encoder.ecc_range(s).map(|r| [*r.start(), *r.end()]),
                    "center_image": s.supports_center_image(),
                }))
                .collect();

            print_json(&Value::Array(formats));
            ExitCode::SUCCESS
        }

        Commands::Generate { text, overrides, export_to } => {
            if let Err(e) = overrides.apply(&mut settings) {
                print_json(&json!({"success": false, "stage": "validating", "error": e}));
                return ExitCode::FAILURE;
            }

            let mut generator = Generator::new(settings);
            match generator.generate(&text) {
                Ok(report) => {
                    let exported = export_to.map(|dir| generator.save_image(&dir));
                    print_json(&json!({
                        "success": true,
                        "report": report,
                        "exported": exported,
                    }));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    print_json(&json!({
                        "success": false,
                        "stage": e.stage(),
                        "error": e.to_string(),
                    }));
                    ExitCode::from(2)
                }
            }
        }
    }
}
