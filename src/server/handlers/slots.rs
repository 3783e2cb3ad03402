//! Image slot API handler.

use axum::Json;

use crate::proposal::{self, SlotInfo};

/// GET /api/slots - Image slots with their physical and pixel sizes.
pub async fn list() -> Json<Vec<SlotInfo>> {
    Json(proposal::slot_table())
}
