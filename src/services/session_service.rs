use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    dao::match_store::local::DeviceStorage,
    dto::session::{EntitlementRequest, SessionResponse, SignInRequest, SignInResponse},
    error::ServiceError,
    services::migration::{MigrationError, MigrationReport, migrate_guest_data},
    state::{
        SharedState,
        identity::{GuestId, Identity, Session, UserId},
    },
};

/// Device slot remembering the guest id between launches.
pub const GUEST_ID_KEY: &str = "rally_score_guest_id";

/// Load the device's guest id, allocating and persisting one on first launch.
///
/// A failed write still yields a usable id for this run.
pub async fn load_or_create_guest_id(device: &Arc<dyn DeviceStorage>) -> GuestId {
    match device.get_item(GUEST_ID_KEY).await {
        Ok(Some(stored)) if !stored.trim().is_empty() => return GuestId::new(stored.trim()),
        Ok(_) => {}
        Err(err) => warn!(error = %err, "could not read guest id; allocating a new one"),
    }

    let guest = GuestId::generate();
    if let Err(err) = device
        .set_item(GUEST_ID_KEY, guest.as_str().to_owned())
        .await
    {
        warn!(guest_id = %guest, error = %err, "could not persist guest id");
    }
    info!(guest_id = %guest, "guest id created");
    guest
}

/// Session used at boot, before any account is known.
pub async fn bootstrap_session(device: &Arc<dyn DeviceStorage>) -> Session {
    Session {
        user_id: None,
        guest_id: Some(load_or_create_guest_id(device).await),
        is_pro: false,
    }
}

/// Resume the current identity's in-progress match into the idle engine.
pub async fn restore_active_match(state: &SharedState) -> Option<String> {
    let identity = state.identity().await;
    let mut engine = state.engine().await;
    engine
        .restore(&identity)
        .await
        .map(|id| id.to_string())
}

pub async fn current_session(state: &SharedState) -> SessionResponse {
    SessionResponse::from(&state.session().await)
}

/// Switch to an authenticated account, optionally taking the guest matches along.
///
/// A match still being played moves with the migration as a single active
/// row on the account. A failed migration leaves the session untouched so the
/// user can retry.
pub async fn sign_in(
    state: &SharedState,
    request: SignInRequest,
) -> Result<SignInResponse, ServiceError> {
    let user = UserId::new(request.user_id);
    let account = Identity::Remote(user.clone());

    let mut engine = state.engine().await;
    engine.settle().await;

    let report = if request.migrate_guest_data {
        let live = engine
            .live_record()
            .filter(|record| !record.owner.is_remote())
            .map(|record| record.id.clone());
        let report = migrate_guest_data(state.repository(), &user, live.as_ref()).await?;
        engine
            .rehome(&account)
            .await
            .map_err(MigrationError::Upload)?;
        report
    } else {
        MigrationReport::default()
    };

    let session = state
        .update_session(|session| {
            session.user_id = Some(user.clone());
            session.guest_id = None;
        })
        .await;
    if let Err(err) = state.device().remove_item(GUEST_ID_KEY).await {
        warn!(error = %err, "could not clear guest id");
    }
    info!(%user, migrated = report.count, "signed in");

    let restored_match_id = engine.restore(&account).await.map(|id| id.to_string());

    Ok(SignInResponse {
        session: SessionResponse::from(&session),
        migrated: report.count,
        leftover: report.leftover,
        restored_match_id,
    })
}

/// Return to guest mode with a fresh guest id.
pub async fn sign_out(state: &SharedState) -> SessionResponse {
    let guest = load_or_create_guest_id(state.device()).await;
    let session = state
        .update_session(|session| {
            session.user_id = None;
            session.guest_id = Some(guest);
            session.is_pro = false;
        })
        .await;
    info!("signed out");
    SessionResponse::from(&session)
}

pub async fn set_entitlement(state: &SharedState, request: EntitlementRequest) -> SessionResponse {
    let session = state
        .update_session(|session| session.is_pro = request.is_pro)
        .await;
    info!(is_pro = session.is_pro, "entitlement updated");
    SessionResponse::from(&session)
}
