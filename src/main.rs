//! # proposal-deck CLI
//!
//! Command-line interface for generating proposal decks.
//!
//! ## Usage
//!
//! ```bash
//! # Run the web form
//! proposal-deck serve --template FTP_Template.pptx
//!
//! # Generate once from JSON form data and a photo
//! proposal-deck generate --template FTP_Template.pptx \
//!     --output out/proposal.pptx \
//!     --data '{"building_name": "Menara Alpha", "address": "1 Jalan Ampang"}' \
//!     --image site.jpg --slot tp_msb
//!
//! # List the shapes of a template and its placeholder candidates
//! proposal-deck inspect --template FTP_Template.pptx
//! ```
//!
//! Logging goes through `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use proposal_deck::{
    DeckError,
    compose::{self, Sentinel},
    deck::{Deck, ShapeRef},
    generate::{GeneratorConfig, ProposalRequest, SlotImage},
    proposal::{ImageSlot, ProposalForm, SLOTS},
    server::{self, ServerConfig},
};

/// proposal-deck - Fill PowerPoint proposal templates from a survey form
#[derive(Parser, Debug)]
#[command(name = "proposal-deck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web form and generation server
    Serve {
        /// Address to listen on
        #[arg(long, env = "PROPOSAL_DECK_LISTEN", default_value = "127.0.0.1:5000")]
        listen: String,

        /// PowerPoint template to fill
        #[arg(long, env = "PROPOSAL_DECK_TEMPLATE", default_value = "FTP_Template.pptx")]
        template: PathBuf,

        /// Directory for generated proposals
        #[arg(long, env = "PROPOSAL_DECK_OUTPUT_DIR", default_value = "generated_proposals")]
        output_dir: PathBuf,

        /// Directory for processed images
        #[arg(long, env = "PROPOSAL_DECK_TEMP_DIR", default_value = "temp_images")]
        temp_dir: PathBuf,
    },

    /// Generate one proposal from JSON form data
    Generate {
        /// PowerPoint template to fill
        #[arg(long)]
        template: PathBuf,

        /// Where to write the generated deck
        #[arg(long)]
        output: PathBuf,

        /// Form data as a JSON object of field name to value
        #[arg(long)]
        data: String,

        /// Photo for the slot given by --slot, used uncropped
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,

        /// Photo for slot 2, used uncropped
        #[arg(long = "image-2", value_name = "FILE")]
        image_2: Option<PathBuf>,

        /// Slot that --image fills
        #[arg(long, default_value = "1", value_parser = ["1", "2", "tp_msb"])]
        slot: String,

        /// Directory for processed images
        #[arg(long, env = "PROPOSAL_DECK_TEMP_DIR", default_value = "temp_images")]
        temp_dir: PathBuf,
    },

    /// List the slides and shapes of a template
    Inspect {
        /// PowerPoint template to inspect
        #[arg(long)]
        template: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), DeckError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            template,
            output_dir,
            temp_dir,
        } => {
            let config = ServerConfig {
                listen_addr: listen,
                generator: GeneratorConfig {
                    template_path: template,
                    output_dir,
                    temp_dir,
                },
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(config))
        }

        Commands::Generate {
            template,
            output,
            data,
            image,
            image_2,
            slot,
            temp_dir,
        } => {
            let form = ProposalForm::from_json(&data)?;
            log::info!("Form data loaded");

            let mut images = Vec::new();
            for (path, slot_id) in [(image, slot.as_str()), (image_2, "2")] {
                let Some(path) = path else { continue };
                let Some(slot) = ImageSlot::by_id(slot_id) else {
                    log::warn!("Unknown image slot {slot_id}, ignoring {}", path.display());
                    continue;
                };
                if let Some(source) = read_image(&path) {
                    images.push(SlotImage {
                        slot,
                        source,
                        crop: None,
                    });
                }
            }

            let config = GeneratorConfig {
                template_path: template,
                output_dir: output
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
                temp_dir,
            };
            let report = config.generate_to(&ProposalRequest { form, images }, &output)?;

            println!("Generated {}", report.output_path.display());
            println!("  images placed:   {}", report.images_placed);
            println!("  tokens replaced: {}", report.tokens_replaced);
            for skipped in &report.skipped {
                println!("  skipped: {}", skipped);
            }
            Ok(())
        }

        Commands::Inspect { template } => {
            let deck = Deck::open(&template)?;
            let sentinels: Vec<Sentinel> = SLOTS.iter().map(ImageSlot::sentinel).collect();

            println!("{}: {} slide(s)", template.display(), deck.slides().len());
            for (i, slide) in deck.slides().iter().enumerate() {
                let candidates = compose::discover(i, slide, &sentinels);
                println!();
                println!("Slide {} ({})", i + 1, slide.part_name());
                for shape in slide.shapes() {
                    let matched = candidates.iter().find(|m| m.shape == shape.index());
                    let marker = match matched {
                        Some(m) => format!("  <- {} ({:?})", SLOTS[m.sentinel].id, m.kind),
                        None => String::new(),
                    };
                    println!("  {}{}", describe(&shape), marker);
                }
            }
            Ok(())
        }
    }
}

/// Read an image file, warning and skipping it if it cannot be read.
fn read_image(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => {
            log::info!("Using image {} ({} bytes)", path.display(), bytes.len());
            Some(bytes)
        }
        Err(e) => {
            log::warn!("Image file not usable, ignoring {}: {}", path.display(), e);
            None
        }
    }
}

/// One line per shape: index, kind, name, geometry in cm, and text.
fn describe(shape: &ShapeRef<'_>) -> String {
    let mut line = format!(
        "#{} {:?} {:?}",
        shape.index(),
        shape.kind(),
        shape.name().unwrap_or_default()
    );
    match shape.geometry() {
        Some(geometry) => {
            let (width, height) = geometry.size_cm();
            line.push_str(&format!(" {:.2}x{:.2} cm", width, height));
        }
        None => line.push_str(" (inherited position)"),
    }
    if let Some(text) = shape.text().filter(|text| !text.trim().is_empty()) {
        line.push_str(&format!(" text={:?}", text));
    }
    if let Some(table) = shape.table() {
        line.push_str(&format!(" table={}x{}", table.len(), table.first().map_or(0, Vec::len)));
    }
    line
}
