//! # proposal-deck - PowerPoint Proposal Generator
//!
//! proposal-deck fills a fixed PowerPoint template from a survey form. It
//! provides:
//!
//! - **Document engine**: load, edit and save `.pptx` packages without
//!   losing anything it does not touch
//! - **Placeholder resolution**: swap named placeholder shapes for photos at
//!   their exact position and size
//! - **Token substitution**: replace `{{TOKEN}}` text while keeping run
//!   formatting
//! - **Image preparation**: crop and resize photos to each slot's physical
//!   size at 300 DPI
//! - **Web form**: an axum server with a browser cropper
//!
//! ## Quick Start
//!
//! ```no_run
//! use proposal_deck::{
//!     compose::{self, ImagePlacement, ImageSource, Layering, Sentinel, TokenMap},
//!     deck::Deck,
//! };
//!
//! let mut deck = Deck::open("FTP_Template.pptx".as_ref())?;
//!
//! // Put a photo where the IMG_PLACEHOLDER shapes are
//! let report = compose::resolve(
//!     &mut deck,
//!     &[ImagePlacement {
//!         sentinel: Sentinel::named("IMG_PLACEHOLDER"),
//!         source: ImageSource::File("site.png".into()),
//!         layering: Layering::Back,
//!     }],
//! );
//! println!("placed {} image(s)", report.insertions.len());
//!
//! // Fill in the text
//! let tokens: TokenMap = [("BUILDINGNAME", "Menara Alpha")].into_iter().collect();
//! tokens.apply(&mut deck);
//!
//! deck.save("proposal.pptx".as_ref())?;
//! # Ok::<(), proposal_deck::DeckError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`xml`] | Order-preserving XML tree |
//! | [`deck`] | `.pptx` package, slides and shapes |
//! | [`compose`] | Placeholder discovery, replacement and token substitution |
//! | [`photo`] | Crop, resize and temp files for photos |
//! | [`proposal`] | Form fields, image slots, file naming |
//! | [`generate`] | One proposal end to end |
//! | [`server`] | Web form and generation API |
//! | [`error`] | Error types |

pub mod compose;
pub mod deck;
pub mod error;
pub mod generate;
pub mod photo;
pub mod proposal;
pub mod server;
pub mod xml;

// Re-exports for convenience
pub use deck::Deck;
pub use error::DeckError;
pub use generate::GeneratorConfig;
