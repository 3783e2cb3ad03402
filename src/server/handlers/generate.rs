//! Proposal generation API handler.

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    error::{DeckError, Result},
    generate::{ProposalRequest, SlotImage},
    photo::{self, CropArea},
    proposal::{ImageSlot, ProposalForm, SLOTS},
};

use super::super::state::AppState;

const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(serde_json::json!({"success": false, "error": message.to_string()})),
    )
}

/// 400 for problems with what was submitted, 500 for everything else.
fn deck_error(e: DeckError) -> ApiError {
    let status = if e.is_user_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    log::error!("[generate] {e}");
    api_error(status, e)
}

/// An image field as submitted: a data URL and its crop descriptor.
struct Upload {
    slot: &'static ImageSlot,
    data_url: String,
    crop: Option<String>,
}

impl Upload {
    fn decode(self) -> Result<SlotImage> {
        let crop = self
            .crop
            .as_deref()
            .map(str::trim)
            .filter(|crop| !crop.is_empty())
            .map(CropArea::parse)
            .transpose()?;
        Ok(SlotImage {
            slot: self.slot,
            source: photo::decode_data_url(&self.data_url)?,
            crop,
        })
    }
}

/// POST /generate - Fill the template from the submitted form and return the deck.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let mut form = ProposalForm::new();
    let mut images: BTreeMap<&'static str, String> = BTreeMap::new();
    let mut crops: BTreeMap<&'static str, String> = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        let value = field
            .text()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Failed to read {}: {}", name, e)))?;

        if let Some(slot) = ImageSlot::by_image_field(&name) {
            if !value.trim().is_empty() {
                images.insert(slot.id, value);
            }
        } else if let Some(slot) = ImageSlot::by_crop_field(&name) {
            crops.insert(slot.id, value);
        } else {
            form.set(&name, &value);
        }
    }

    let uploads: Vec<Upload> = SLOTS
        .iter()
        .filter_map(|slot| {
            let data_url = images.remove(slot.id)?;
            Some(Upload {
                slot,
                data_url,
                crop: crops.remove(slot.id),
            })
        })
        .collect();
    log::info!(
        "[generate] Request for {:?} with {} image(s)",
        form.get("address"),
        uploads.len()
    );

    // Image processing and deck rewriting are CPU-bound
    let config = state.config.generator.clone();
    let report = tokio::task::spawn_blocking(move || {
        let images = uploads
            .into_iter()
            .map(Upload::decode)
            .collect::<Result<Vec<_>>>()?;
        config.generate(&ProposalRequest { form, images })
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Task error: {}", e)))?
    .map_err(deck_error)?;

    for skipped in &report.skipped {
        log::warn!("[generate] Skipped: {skipped}");
    }

    let bytes = tokio::fs::read(&report.output_path).await.map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read generated file: {}", e),
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, PPTX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.file_name),
            ),
        ],
        bytes,
    ))
}
