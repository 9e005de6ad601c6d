// libs/negotiation-cell/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{AppError, User};

use crate::error::NegotiationError;
use crate::models::{
    Actor, Appointment, CreateAppointmentRequest, ListAppointmentsQuery, PartyRole,
    SubmitTransitionRequest,
};
use crate::services::{NegotiationService, NotificationRelayService};

// ==================== HELPERS ====================

/// Maps the protocol's error taxonomy onto HTTP statuses. Version conflicts
/// become 412 so clients can distinguish "refresh and retry" from the 409
/// they get for commands the current state simply does not allow.
fn negotiation_error_to_http(error: NegotiationError) -> AppError {
    let message = error.to_string();
    match error {
        NegotiationError::Validation(msg) => AppError::ValidationError(msg),
        NegotiationError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        NegotiationError::UnauthorizedTransition { .. } => AppError::Forbidden(message),
        NegotiationError::InvalidTransition { .. } => AppError::Conflict(message),
        NegotiationError::ConcurrencyConflict { .. } => AppError::PreconditionFailed(message),
        NegotiationError::ConfirmedAppointmentElapsed => AppError::Conflict(message),
        NegotiationError::Storage(msg) => AppError::Database(msg),
    }
}

/// Resolves the authenticated user to a negotiating party. Admin and other
/// staff roles are valid users but not parties, so they cannot drive the
/// negotiation itself.
fn actor_from_user(user: &User) -> Result<Actor, AppError> {
    let role = user
        .role
        .as_deref()
        .and_then(PartyRole::from_role_str)
        .ok_or_else(|| {
            AppError::Forbidden(format!(
                "Role {} cannot act on appointment negotiations",
                user.role.as_deref().unwrap_or("unknown")
            ))
        })?;

    let party_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Invalid user id in token".to_string()))?;

    Ok(Actor { role, party_id })
}

fn ensure_party(appointment: &Appointment, actor: &Actor) -> Result<(), AppError> {
    if !appointment.involves(&actor.role, actor.party_id) {
        return Err(AppError::Forbidden(
            "Not a party to this appointment".to_string(),
        ));
    }
    Ok(())
}

// ==================== APPOINTMENT NEGOTIATION HANDLERS ====================

/// POST /appointments
///
/// A patient files a request for a slot; the appointment starts out
/// `pending` and the clinic is notified that there is something to review.
#[axum::debug_handler]
pub async fn create_appointment_handler(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let is_patient = request.patient_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_patient && !is_admin {
        return Err(AppError::Forbidden(
            "Not authorized to request appointments for other patients".to_string(),
        ));
    }

    let service = NegotiationService::new(&state, auth.token());

    let (appointment, intents) = service
        .create_appointment(request, Utc::now())
        .await
        .map_err(negotiation_error_to_http)?;

    let relay = NotificationRelayService::new(&state);
    tokio::spawn(async move {
        relay.deliver_all(intents).await;
    });

    Ok(Json(json!({
        "success": true,
        "message": "Appointment request submitted",
        "appointment": appointment
    })))
}

/// POST /appointments/{appointment_id}/transitions
///
/// One party submits a negotiation command together with the version it
/// last saw. The engine decides; on success the caller gets the new status
/// and version back and the counterpart gets notified.
#[axum::debug_handler]
pub async fn submit_transition_handler(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SubmitTransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let service = NegotiationService::new(&state, auth.token());

    let current = service
        .get_appointment(appointment_id)
        .await
        .map_err(negotiation_error_to_http)?;
    ensure_party(&current, &actor)?;

    let outcome = service
        .submit_transition(
            appointment_id,
            &actor,
            &request.command,
            request.expected_version,
            request.message.as_deref(),
            Utc::now(),
        )
        .await
        .map_err(negotiation_error_to_http)?;

    let appointment = outcome.appointment;
    let status = appointment.status().clone();
    let version = appointment.version();

    let relay = NotificationRelayService::new(&state);
    let intents = outcome.intents;
    tokio::spawn(async move {
        relay.deliver_all(intents).await;
    });

    Ok(Json(json!({
        "success": true,
        "status": status,
        "version": version,
        "appointment": appointment
    })))
}

/// GET /appointments/{appointment_id}
#[axum::debug_handler]
pub async fn get_appointment_handler(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NegotiationService::new(&state, auth.token());

    let appointment = service
        .get_appointment(appointment_id)
        .await
        .map_err(negotiation_error_to_http)?;

    if user.role.as_deref() != Some("admin") {
        let actor = actor_from_user(&user)?;
        ensure_party(&appointment, &actor)?;
    }

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

/// GET /appointments?status=...
///
/// Lists the authenticated party's appointments, most recently active
/// first.
#[axum::debug_handler]
pub async fn list_appointments_handler(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<ListAppointmentsQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let service = NegotiationService::new(&state, auth.token());

    let appointments = service
        .list_for_party(&actor.role, actor.party_id, params.status.as_ref())
        .await
        .map_err(negotiation_error_to_http)?;

    let total = appointments.len();

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": total
    })))
}
