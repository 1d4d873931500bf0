//! Member profile edits.
//!
//! Only logged-in members have a profile; visitor sessions are turned away
//! before any platform call.

use docet_core::{MemberProfile, MemberUpdate, TokenRole};
use thiserror::Error;
use tracing::instrument;

use crate::notify::{Notifier, Toast};
use crate::wix::{MemberApi, WixError};

pub const PROFILE_UPDATED: &str = "Profile updated";
pub const PROFILE_UPDATE_FAILURE: &str = "Failed to update profile. Please try again.";

/// Member profile failures.
#[derive(Debug, Error)]
pub enum MemberError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("member service failed: {0}")]
    Remote(#[from] WixError),
}

/// Profile of the session's member.
///
/// # Errors
///
/// Returns [`MemberError::NotLoggedIn`] for visitor sessions.
#[instrument(skip(api))]
pub async fn current_profile<A: MemberApi>(
    api: &A,
    role: TokenRole,
) -> Result<MemberProfile, MemberError> {
    if role != TokenRole::Member {
        return Err(MemberError::NotLoggedIn);
    }
    api.current_member().await.map_err(|e| match e {
        WixError::Unauthorized => MemberError::NotLoggedIn,
        e => MemberError::Remote(e),
    })
}

/// Update the session member's name.
///
/// Queues a toast either way.
///
/// # Errors
///
/// Returns [`MemberError::NotLoggedIn`] for visitor sessions, or
/// [`MemberError::Remote`] if Wix refuses the update.
#[instrument(skip(api, notifier, update))]
pub async fn update_profile<A: MemberApi, N: Notifier>(
    api: &A,
    notifier: &N,
    role: TokenRole,
    update: &MemberUpdate,
) -> Result<MemberProfile, MemberError> {
    let member = current_profile(api, role).await?;

    match api.update_member(&member.id, update).await {
        Ok(profile) => {
            notifier.notify(Toast::new(PROFILE_UPDATED));
            Ok(profile)
        }
        Err(err) => {
            tracing::error!(error = %err, member = %member.id, "Failed to update profile");
            notifier.notify(Toast::destructive(PROFILE_UPDATE_FAILURE));
            Err(MemberError::Remote(err))
        }
    }
}
