//! # Proposal Generation
//!
//! One request end to end:
//!
//! 1. Load the template ([`Deck::open`])
//! 2. Prepare each submitted photo for its slot and park it in the temp dir
//! 3. Replace image placeholders ([`compose::resolve`])
//! 4. Substitute form tokens, stripping leftover text sentinels
//! 5. Save next to the other proposals
//!
//! Temp images are removed when the request ends, whatever the outcome.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::compose::{self, ImagePlacement, ImageSource};
use crate::deck::Deck;
use crate::error::Result;
use crate::photo::{self, CropArea, TempAsset};
use crate::proposal::{ImageSlot, ProposalForm, SLOTS};

/// Where templates are read from and files are written to.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub template_path: PathBuf,
    /// Finished proposals
    pub output_dir: PathBuf,
    /// Processed images, removed after each request
    pub temp_dir: PathBuf,
}

/// A photo submitted for one slot.
#[derive(Debug, Clone)]
pub struct SlotImage {
    pub slot: &'static ImageSlot,
    /// Encoded source image (JPEG, PNG, ...)
    pub source: Vec<u8>,
    /// Selection in source pixels; `None` uses the whole image
    pub crop: Option<CropArea>,
}

/// Everything needed to produce one proposal.
#[derive(Debug, Clone, Default)]
pub struct ProposalRequest {
    pub form: ProposalForm,
    pub images: Vec<SlotImage>,
}

/// What a successful generation produced.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub output_path: PathBuf,
    pub file_name: String,
    pub images_placed: usize,
    pub tokens_replaced: usize,
    /// Placeholders left in place because their picture could not be built
    pub skipped: Vec<String>,
}

impl GeneratorConfig {
    /// Create the output and temp directories if needed.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        fs::create_dir_all(&self.temp_dir)?;
        Ok(())
    }

    /// Generate into the output directory under a name derived from the
    /// address and the current time. A name already taken gets a `_1`, `_2`,
    /// ... suffix, so every call writes its own file.
    pub fn generate(&self, request: &ProposalRequest) -> Result<GenerationReport> {
        let file_name = request.form.output_filename(Local::now().naive_local());
        fs::create_dir_all(&self.output_dir)?;
        let output = reserve_output(&self.output_dir, &file_name)?;

        let result = self.generate_to(request, &output);
        if result.is_err() {
            if let Err(e) = fs::remove_file(&output) {
                log::warn!("Could not release {}: {}", output.display(), e);
            }
        }
        result
    }

    /// Generate into `output`.
    pub fn generate_to(&self, request: &ProposalRequest, output: &Path) -> Result<GenerationReport> {
        let mut deck = Deck::open(&self.template_path)?;
        log::info!(
            "Loaded template {} ({} slides)",
            self.template_path.display(),
            deck.slides().len()
        );

        // Held until the end of this call; dropping them deletes the files.
        let mut assets = Vec::with_capacity(request.images.len());
        let mut placements = Vec::with_capacity(request.images.len());
        for image in &request.images {
            let prepared = photo::prepare(&image.source, image.crop.as_ref(), image.slot.size)?;
            let asset = TempAsset::write(&self.temp_dir, image.slot.id, &prepared.png)?;
            placements.push(ImagePlacement {
                sentinel: image.slot.sentinel(),
                source: ImageSource::File(asset.path().to_path_buf()),
                layering: image.slot.layering,
            });
            assets.push(asset);
        }
        if placements.is_empty() {
            log::info!("No images provided, generating a text-only proposal");
        }

        let report = compose::resolve(&mut deck, &placements);

        let mut tokens = request.form.tokens();
        for text in SLOTS.iter().filter_map(|slot| slot.text) {
            tokens.insert_literal(text, "");
        }
        let tokens_replaced = tokens.apply(&mut deck);
        log::info!(
            "Placed {} image(s), replaced {tokens_replaced} token(s)",
            report.insertions.len()
        );

        if let Some(dir) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        deck.save(output)?;
        log::info!("Saved {}", output.display());

        Ok(GenerationReport {
            output_path: output.to_path_buf(),
            file_name: output
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            images_placed: report.insertions.len(),
            tokens_replaced,
            skipped: report.failures.iter().map(ToString::to_string).collect(),
        })
    }
}

/// Claim `file_name` in `dir` by creating it empty, moving to `stem_1.ext`,
/// `stem_2.ext`, ... while the name is taken.
fn reserve_output(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let (stem, extension) = file_name.rsplit_once('.').unwrap_or((file_name, ""));
    let mut attempt = 0u32;
    loop {
        let candidate = match (attempt, extension) {
            (0, _) => file_name.to_string(),
            (n, "") => format!("{stem}_{n}"),
            (n, extension) => format!("{stem}_{n}.{extension}"),
        };
        let path = dir.join(candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserve_output_suffixes_taken_names() {
        let dir = tempfile::tempdir().unwrap();
        let first = reserve_output(dir.path(), "proposal_A_20240115_093005.pptx").unwrap();
        let second = reserve_output(dir.path(), "proposal_A_20240115_093005.pptx").unwrap();
        let third = reserve_output(dir.path(), "proposal_A_20240115_093005.pptx").unwrap();

        assert_eq!(first, dir.path().join("proposal_A_20240115_093005.pptx"));
        assert_eq!(second, dir.path().join("proposal_A_20240115_093005_1.pptx"));
        assert_eq!(third, dir.path().join("proposal_A_20240115_093005_2.pptx"));
        assert!(first.is_file() && second.is_file() && third.is_file());
    }

    #[test]
    fn test_failed_generation_releases_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            template_path: dir.path().join("missing.pptx"),
            output_dir: dir.path().join("generated_proposals"),
            temp_dir: dir.path().join("temp_images"),
        };
        let err = config.generate(&ProposalRequest::default()).unwrap_err();
        assert!(matches!(err, crate::error::DeckError::TemplateNotFound(_)));
        assert_eq!(fs::read_dir(&config.output_dir).unwrap().count(), 0);
    }
}
