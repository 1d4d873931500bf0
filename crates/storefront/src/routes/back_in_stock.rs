//! Back-in-stock subscription handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::PlatformSession;
use crate::services::back_in_stock::{self, BackInStockForm};
use crate::state::AppState;

/// Confirmation shown under the subscription form.
#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub message: &'static str,
}

/// `POST /api/back-in-stock`
#[instrument(skip(state, session, form), fields(product_id = %form.product_id))]
pub async fn subscribe(
    State(state): State<AppState>,
    session: PlatformSession,
    Json(form): Json<BackInStockForm>,
) -> Result<Json<SubscribeResponse>, AppError> {
    let wix = state.wix().session(session.tokens());
    let message = back_in_stock::subscribe(&wix, &state.config().base_url, form).await?;
    Ok(Json(SubscribeResponse { message }))
}
