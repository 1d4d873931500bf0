//! Member profile handlers.

use axum::{Json, extract::State};
use docet_core::{MemberProfile, MemberUpdate};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::middleware::PlatformSession;
use crate::notify::Toast;
use crate::services::members;
use crate::state::AppState;

/// Member profile as returned to the front end.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl From<MemberProfile> for MemberView {
    fn from(member: MemberProfile) -> Self {
        Self {
            display_name: member.display_name(),
            id: member.id.into_inner(),
            login_email: member.login_email,
            first_name: member.first_name,
            last_name: member.last_name,
        }
    }
}

/// Profile plus any toasts queued for the session.
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub member: MemberView,
    pub toasts: Vec<Toast>,
}

/// Profile edit form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// `GET /api/members/me`
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: PlatformSession,
) -> Result<Json<MemberResponse>, AppError> {
    let wix = state.wix().session(session.tokens());
    let toasts = state.carts().session(session.key()).await.toasts;

    let member = members::current_profile(&wix, session.tokens().role()).await?;

    Ok(Json(MemberResponse {
        member: member.into(),
        toasts: toasts.drain(),
    }))
}

/// `PATCH /api/members/me`
#[instrument(skip(state, session, req))]
pub async fn update(
    State(state): State<AppState>,
    session: PlatformSession,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<Json<MemberResponse>, AppError> {
    add_breadcrumb("member", "Update profile", None);
    let wix = state.wix().session(session.tokens());
    let toasts = state.carts().session(session.key()).await.toasts;

    let update = MemberUpdate::new(&req.first_name, &req.last_name);
    let member =
        members::update_profile(&wix, &toasts, session.tokens().role(), &update).await?;

    Ok(Json(MemberResponse {
        member: member.into(),
        toasts: toasts.drain(),
    }))
}
