//! # Error Types
//!
//! This module defines error types used throughout the proposal-deck library.
//!
//! Errors fall into two groups. Structural failures (missing template, a
//! package that cannot be read or saved) abort the whole generation. Image
//! failures only affect the one image they belong to; see
//! [`DeckError::is_user_error`] for the ones a user can fix by adjusting
//! their input.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for proposal-deck operations
#[derive(Debug, Error)]
pub enum DeckError {
    /// The template file does not exist
    #[error("Template file not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// The crop rectangle collapses to nothing once clamped to the image
    #[error("Invalid crop area - please adjust your selection")]
    InvalidCropArea,

    /// The crop descriptor could not be parsed
    #[error("Invalid crop coordinates: {0}")]
    MalformedCropData(String),

    /// Submitted form data is not a JSON object of field values
    #[error("Invalid form data: {0}")]
    InvalidFormData(String),

    /// One picture could not be placed over one placeholder
    #[error("Could not insert {sentinel} on slide {slide}: {reason}")]
    ImageInsertion {
        /// 1-based slide number
        slide: usize,
        sentinel: String,
        reason: String,
    },

    /// The finished document could not be written
    #[error("Failed to save presentation: {0}")]
    Serialization(String),

    /// The template is not a readable OOXML package
    #[error("Package error: {0}")]
    Package(String),

    /// An XML part is malformed
    #[error("XML error in {part}: {reason}")]
    Xml { part: String, reason: String },

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeckError {
    /// True for failures caused by what the user submitted, as opposed to
    /// failures of the template or the machine.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DeckError::InvalidCropArea
                | DeckError::MalformedCropData(_)
                | DeckError::InvalidFormData(_)
                | DeckError::Image(_)
        )
    }

    pub(crate) fn xml(part: &str, reason: impl ToString) -> Self {
        DeckError::Xml {
            part: part.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for DeckError {
    fn from(e: zip::result::ZipError) -> Self {
        DeckError::Package(e.to_string())
    }
}

impl From<image::ImageError> for DeckError {
    fn from(e: image::ImageError) -> Self {
        DeckError::Image(e.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T, E = DeckError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(DeckError::InvalidCropArea.is_user_error());
        assert!(DeckError::MalformedCropData("x".into()).is_user_error());
        assert!(DeckError::InvalidFormData("x".into()).is_user_error());
        assert!(!DeckError::TemplateNotFound(PathBuf::from("a.pptx")).is_user_error());
        assert!(!DeckError::Serialization("disk full".into()).is_user_error());
    }

    #[test]
    fn test_messages() {
        let err = DeckError::ImageInsertion {
            slide: 2,
            sentinel: "IMG_PLACEHOLDER".into(),
            reason: "corrupt".into(),
        };
        assert_eq!(
            err.to_string(),
            "Could not insert IMG_PLACEHOLDER on slide 2: corrupt"
        );
        assert_eq!(
            DeckError::TemplateNotFound(PathBuf::from("FTP_Template.pptx")).to_string(),
            "Template file not found: FTP_Template.pptx"
        );
    }
}
