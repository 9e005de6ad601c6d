// libs/negotiation-cell/src/services/negotiation.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::NegotiationError;
use crate::models::{
    Actor, Appointment, AppointmentStatus, CreateAppointmentRequest, NegotiationCommand,
    NotificationEvent, NotificationIntent, PartyRole, TransitionOutcome,
};
use crate::repository::{AppointmentRepository, SupabaseAppointmentRepository};
use crate::services::engine::NegotiationEngine;
use crate::services::intents::NotificationIntentEmitter;

/// Glue between the pure negotiation engine and the repository: load the
/// current row, let the engine decide, persist the result with a version
/// check. Time always comes in from the caller.
pub struct NegotiationService {
    repository: Arc<dyn AppointmentRepository>,
    engine: NegotiationEngine,
    emitter: NotificationIntentEmitter,
}

impl NegotiationService {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self::with_repository(Arc::new(SupabaseAppointmentRepository::new(
            config, auth_token,
        )))
    }

    pub fn with_repository(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self {
            repository,
            engine: NegotiationEngine::new(),
            emitter: NotificationIntentEmitter::new(),
        }
    }

    /// Creates a `pending` appointment from a patient's request and returns
    /// it together with the intent that tells the clinic a request arrived.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<(Appointment, Vec<NotificationIntent>), NegotiationError> {
        // **Step 1: Validate the request and build the aggregate**
        let mut appointment = Appointment::create(
            request.patient_id,
            request.clinic_id,
            request.requested_date,
            request.requested_time,
            request.service_type,
            request.duration_minutes,
            now,
        )?;

        if let Some(note) = request.note {
            if !note.trim().is_empty() {
                appointment.append_message(PartyRole::Patient, note, now);
            }
        }

        // **Step 2: Persist the new row**
        self.repository.insert(&appointment).await?;

        // **Step 3: Let the clinic know there is something to review**
        let intents = self.emitter.emit(
            NotificationEvent::AppointmentRequested,
            &appointment,
            &PartyRole::Patient,
            Some((
                appointment.original_request().date,
                appointment.original_request().time,
            )),
        );

        info!(
            "Created appointment {} for patient {} at clinic {}",
            appointment.id(),
            appointment.patient_id(),
            appointment.clinic_id()
        );

        Ok((appointment, intents))
    }

    /// Runs one command through the engine against the stored appointment.
    ///
    /// `expected_version` is the version the caller last saw; if the stored
    /// row has moved past it, either the engine or the compare-and-save
    /// reports a `ConcurrencyConflict` and nothing is written.
    pub async fn submit_transition(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        command: &NegotiationCommand,
        expected_version: i64,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, NegotiationError> {
        // **Step 1: Load the current state**
        let current = self.repository.load(appointment_id).await?;

        // **Step 2: Evaluate the command**
        let outcome = self
            .engine
            .apply(&current, actor, command, expected_version, message, now)?;

        // **Step 3: Persist, guarded by the version we evaluated against**
        self.repository
            .compare_and_save(&outcome.appointment, expected_version)
            .await?;

        Ok(outcome)
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, NegotiationError> {
        self.repository.load(id).await
    }

    pub async fn list_for_party(
        &self,
        role: &PartyRole,
        party_id: Uuid,
        status: Option<&AppointmentStatus>,
    ) -> Result<Vec<Appointment>, NegotiationError> {
        self.repository.list_by_party(role, party_id, status).await
    }
}
