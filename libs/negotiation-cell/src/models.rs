// libs/negotiation-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::NegotiationError;

// ==================== APPOINTMENT AGGREGATE ====================

/// A patient's appointment request and everything the negotiation over it
/// has produced so far.
///
/// Fields are deliberately not public outside this crate: every change to a
/// stored appointment goes through [`crate::services::NegotiationEngine`],
/// which is the only writer allowed to touch status, slots, or version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub(crate) id: Uuid,
    pub(crate) patient_id: Uuid,
    pub(crate) clinic_id: Uuid,
    pub(crate) status: AppointmentStatus,
    pub(crate) original_request: SlotRequest,
    pub(crate) counter_offer: Option<ProposedSlot>,
    pub(crate) confirmed_details: Option<ConfirmedSlot>,
    pub(crate) duration_minutes: i32,
    pub(crate) messages: Vec<AppointmentMessage>,
    pub(crate) last_activity_at: DateTime<Utc>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) version: i64,
}

impl Appointment {
    /// Builds a fresh `pending` appointment from a patient's request.
    ///
    /// `now` is supplied by the caller so that creation, like every
    /// transition, never reads the wall clock itself.
    pub fn create(
        patient_id: Uuid,
        clinic_id: Uuid,
        requested_date: NaiveDate,
        requested_time: NaiveTime,
        service_type: String,
        duration_minutes: i32,
        now: DateTime<Utc>,
    ) -> Result<Self, NegotiationError> {
        if patient_id.is_nil() || clinic_id.is_nil() {
            return Err(NegotiationError::Validation(
                "Patient and clinic identifiers are required".to_string(),
            ));
        }

        if service_type.trim().is_empty() {
            return Err(NegotiationError::Validation(
                "Service type cannot be empty".to_string(),
            ));
        }

        if duration_minutes <= 0 {
            return Err(NegotiationError::Validation(
                "Duration must be a positive number of minutes".to_string(),
            ));
        }

        let requested_start = requested_date.and_time(requested_time).and_utc();
        if requested_start <= now {
            return Err(NegotiationError::Validation(
                "Requested appointment time must be in the future".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            patient_id,
            clinic_id,
            status: AppointmentStatus::Pending,
            original_request: SlotRequest {
                date: requested_date,
                time: requested_time,
                service_type,
                duration_minutes,
            },
            counter_offer: None,
            confirmed_details: None,
            duration_minutes,
            messages: Vec::new(),
            last_activity_at: now,
            created_at: now,
            version: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    pub fn clinic_id(&self) -> Uuid {
        self.clinic_id
    }

    pub fn status(&self) -> &AppointmentStatus {
        &self.status
    }

    pub fn original_request(&self) -> &SlotRequest {
        &self.original_request
    }

    pub fn counter_offer(&self) -> Option<&ProposedSlot> {
        self.counter_offer.as_ref()
    }

    pub fn confirmed_details(&self) -> Option<&ConfirmedSlot> {
        self.confirmed_details.as_ref()
    }

    pub fn duration_minutes(&self) -> i32 {
        self.duration_minutes
    }

    pub fn messages(&self) -> &[AppointmentMessage] {
        &self.messages
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// True when the given party is one of the two sides of this appointment.
    pub fn involves(&self, role: &PartyRole, party_id: Uuid) -> bool {
        match role {
            PartyRole::Patient => self.patient_id == party_id,
            PartyRole::Clinic => self.clinic_id == party_id,
        }
    }

    /// The other side of the negotiation, as a (role, id) pair.
    pub fn counterpart_of(&self, role: &PartyRole) -> (PartyRole, Uuid) {
        match role {
            PartyRole::Patient => (PartyRole::Clinic, self.clinic_id),
            PartyRole::Clinic => (PartyRole::Patient, self.patient_id),
        }
    }

    /// Checks the status-dependent slot fields: a counter-offer exists exactly
    /// while the appointment is `counter_offered`, confirmed details exactly
    /// while it is `confirmed`.
    pub fn status_fields_consistent(&self) -> bool {
        let counter_ok = match self.status {
            AppointmentStatus::CounterOffered => self.counter_offer.is_some(),
            _ => self.counter_offer.is_none(),
        };
        let confirmed_ok = match self.status {
            AppointmentStatus::Confirmed => self.confirmed_details.is_some(),
            _ => self.confirmed_details.is_none(),
        };
        counter_ok && confirmed_ok
    }

    pub(crate) fn append_message(&mut self, author: PartyRole, text: String, sent_at: DateTime<Utc>) {
        self.messages.push(AppointmentMessage {
            author,
            text,
            sent_at,
        });
    }
}

// ==================== STATUS AND PARTIES ====================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    CounterOffered,
    Confirmed,
    Rejected,
    Cancelled,
}

impl AppointmentStatus {
    /// Terminal statuses admit no further transitions for anyone.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Cancelled
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::CounterOffered => write!(f, "counter_offered"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The two sides that may act on an appointment. Staff accounts that are
/// neither (e.g. platform admins) cannot drive the negotiation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Patient,
    Clinic,
}

impl PartyRole {
    pub fn from_role_str(role: &str) -> Option<Self> {
        match role {
            "patient" => Some(PartyRole::Patient),
            "clinic" => Some(PartyRole::Clinic),
            _ => None,
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Patient => write!(f, "patient"),
            PartyRole::Clinic => write!(f, "clinic"),
        }
    }
}

/// An authenticated party submitting a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub role: PartyRole,
    pub party_id: Uuid,
}

// ==================== SLOTS ====================

/// What the patient originally asked for. Immutable once the appointment
/// is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub service_type: String,
    pub duration_minutes: i32,
}

/// A clinic's alternative slot. An omitted duration means "same as before".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposedSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: Option<i32>,
}

/// The slot both sides settled on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmedSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
}

impl ConfirmedSlot {
    /// Start instant of the settled slot, interpreted as UTC.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }
}

/// A free-text note one party attached to a transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentMessage {
    pub author: PartyRole,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

// ==================== COMMANDS ====================

/// Everything a party can ask the negotiation to do. The engine decides,
/// per current status and actor role, whether the command is allowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum NegotiationCommand {
    Accept,
    CounterOffer {
        proposed_date: Option<NaiveDate>,
        proposed_time: Option<NaiveTime>,
        proposed_duration_minutes: Option<i32>,
    },
    Reject,
    Cancel,
    AcceptCounterOffer,
    RejectCounterOffer,
    Reschedule {
        proposed_date: Option<NaiveDate>,
        proposed_time: Option<NaiveTime>,
        proposed_duration_minutes: Option<i32>,
    },
}

impl fmt::Display for NegotiationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationCommand::Accept => write!(f, "accept"),
            NegotiationCommand::CounterOffer { .. } => write!(f, "counter_offer"),
            NegotiationCommand::Reject => write!(f, "reject"),
            NegotiationCommand::Cancel => write!(f, "cancel"),
            NegotiationCommand::AcceptCounterOffer => write!(f, "accept_counter_offer"),
            NegotiationCommand::RejectCounterOffer => write!(f, "reject_counter_offer"),
            NegotiationCommand::Reschedule { .. } => write!(f, "reschedule"),
        }
    }
}

// ==================== NOTIFICATION INTENTS ====================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NotificationEvent {
    AppointmentRequested,
    AppointmentConfirmed,
    CounterOfferMade,
    AppointmentRejected,
    AppointmentCancelled,
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationEvent::AppointmentRequested => write!(f, "AppointmentRequested"),
            NotificationEvent::AppointmentConfirmed => write!(f, "AppointmentConfirmed"),
            NotificationEvent::CounterOfferMade => write!(f, "CounterOfferMade"),
            NotificationEvent::AppointmentRejected => write!(f, "AppointmentRejected"),
            NotificationEvent::AppointmentCancelled => write!(f, "AppointmentCancelled"),
        }
    }
}

/// A record of who should be told about a transition. Produced alongside the
/// updated appointment and handed to the relay for best-effort delivery
/// once the change has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationIntent {
    pub recipient_role: PartyRole,
    pub recipient_id: Uuid,
    pub event: NotificationEvent,
    pub appointment_id: Uuid,
    pub slot_date: Option<NaiveDate>,
    pub slot_time: Option<NaiveTime>,
}

/// The updated appointment plus the notifications an accepted transition
/// produced. Both come out of the engine together so callers persist and
/// deliver the same picture of the change.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub appointment: Appointment,
    pub intents: Vec<NotificationIntent>,
}

// ==================== REQUEST / RESPONSE TYPES ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub service_type: String,
    pub duration_minutes: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTransitionRequest {
    pub expected_version: i64,
    #[serde(flatten)]
    pub command: NegotiationCommand,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
}
