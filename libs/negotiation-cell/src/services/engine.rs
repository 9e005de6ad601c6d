// libs/negotiation-cell/src/services/engine.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};

use crate::error::NegotiationError;
use crate::models::{
    Actor, Appointment, AppointmentStatus, ConfirmedSlot, NegotiationCommand, NotificationEvent,
    PartyRole, ProposedSlot, TransitionOutcome,
};
use crate::services::intents::NotificationIntentEmitter;

/// Which side of the negotiation a (status, command) pair belongs to.
#[derive(Debug, Clone, PartialEq)]
enum ActorRule {
    PatientOnly,
    ClinicOnly,
    EitherParty,
}

impl ActorRule {
    fn permits(&self, role: &PartyRole) -> bool {
        match self {
            ActorRule::PatientOnly => *role == PartyRole::Patient,
            ActorRule::ClinicOnly => *role == PartyRole::Clinic,
            ActorRule::EitherParty => true,
        }
    }
}

/// The transition table. `None` means the command simply does not exist for
/// that status, whoever asks; terminal statuses fall through to `None` for
/// every command.
fn transition_rule(status: &AppointmentStatus, command: &NegotiationCommand) -> Option<ActorRule> {
    use AppointmentStatus::*;
    use NegotiationCommand::*;

    match (status, command) {
        (Pending, Accept) => Some(ActorRule::ClinicOnly),
        (Pending, CounterOffer { .. }) => Some(ActorRule::ClinicOnly),
        (Pending, Reject) => Some(ActorRule::ClinicOnly),
        (Pending, Cancel) => Some(ActorRule::PatientOnly),
        (CounterOffered, AcceptCounterOffer) => Some(ActorRule::PatientOnly),
        (CounterOffered, RejectCounterOffer) => Some(ActorRule::PatientOnly),
        (CounterOffered, Cancel) => Some(ActorRule::PatientOnly),
        (Confirmed, Cancel) => Some(ActorRule::EitherParty),
        (Confirmed, Reschedule { .. }) => Some(ActorRule::ClinicOnly),
        _ => None,
    }
}

/// The single decision point for appointment transitions.
///
/// `apply` is a pure function of its inputs: it reads no clock, touches no
/// storage, and either returns the fully updated appointment with its
/// notification intents or an error that leaves the input untouched. Checks
/// run in a fixed order so concurrent writers always surface as a version
/// conflict rather than a misleading state or role error.
pub struct NegotiationEngine {
    emitter: NotificationIntentEmitter,
}

impl NegotiationEngine {
    pub fn new() -> Self {
        Self {
            emitter: NotificationIntentEmitter::new(),
        }
    }

    pub fn apply(
        &self,
        appointment: &Appointment,
        actor: &Actor,
        command: &NegotiationCommand,
        expected_version: i64,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, NegotiationError> {
        // **Step 1: Version check before anything else**
        if appointment.version() != expected_version {
            debug!(
                "Stale command {} for appointment {}: expected version {}, current {}",
                command,
                appointment.id(),
                expected_version,
                appointment.version()
            );
            return Err(NegotiationError::ConcurrencyConflict {
                expected: expected_version,
                actual: appointment.version(),
            });
        }

        // **Step 2: Does this command exist for the current status at all?**
        let rule = transition_rule(appointment.status(), command).ok_or_else(|| {
            warn!(
                "Rejected command {} for appointment {} in status {}",
                command,
                appointment.id(),
                appointment.status()
            );
            NegotiationError::InvalidTransition {
                status: appointment.status().clone(),
                command: command.to_string(),
            }
        })?;

        // **Step 3: Is the acting role the one the table assigns?**
        if !rule.permits(&actor.role) {
            warn!(
                "Role {} attempted {} on appointment {} in status {}",
                actor.role,
                command,
                appointment.id(),
                appointment.status()
            );
            return Err(NegotiationError::UnauthorizedTransition {
                role: actor.role.to_string(),
                command: command.to_string(),
                status: appointment.status().clone(),
            });
        }

        // **Step 4: Payload and time guards, then the effect itself**
        let mut next = appointment.clone();
        let (event, slot) = Self::execute(&mut next, command, now)?;

        if let Some(text) = message {
            if !text.trim().is_empty() {
                next.append_message(actor.role.clone(), text.to_string(), now);
            }
        }

        next.version += 1;
        next.last_activity_at = now;
        debug_assert!(next.status_fields_consistent());

        // **Step 5: Tell the other side what happened**
        let intents = self.emitter.emit(event, &next, &actor.role, slot);

        info!(
            "Appointment {} moved {} -> {} (version {}) via {}",
            next.id(),
            appointment.status(),
            next.status(),
            next.version(),
            command
        );

        Ok(TransitionOutcome {
            appointment: next,
            intents,
        })
    }

    /// Applies the effect of an already-authorized command to `next`, which
    /// starts as a clone of the current appointment. Returns the notification
    /// event and the slot the notification should reference.
    fn execute(
        next: &mut Appointment,
        command: &NegotiationCommand,
        now: DateTime<Utc>,
    ) -> Result<(NotificationEvent, Option<(NaiveDate, NaiveTime)>), NegotiationError> {
        match command {
            NegotiationCommand::Accept => {
                let request = next.original_request.clone();
                next.confirmed_details = Some(ConfirmedSlot {
                    date: request.date,
                    time: request.time,
                    duration_minutes: request.duration_minutes,
                });
                next.status = AppointmentStatus::Confirmed;
                Ok((
                    NotificationEvent::AppointmentConfirmed,
                    Some((request.date, request.time)),
                ))
            }

            NegotiationCommand::CounterOffer {
                proposed_date,
                proposed_time,
                proposed_duration_minutes,
            }
            | NegotiationCommand::Reschedule {
                proposed_date,
                proposed_time,
                proposed_duration_minutes,
            } => {
                let offer =
                    Self::build_offer(proposed_date, proposed_time, proposed_duration_minutes)?;
                let slot = (offer.date, offer.time);
                // A reschedule walks a confirmed appointment back to the
                // negotiating table, so the settled slot is gone.
                next.confirmed_details = None;
                next.counter_offer = Some(offer);
                next.status = AppointmentStatus::CounterOffered;
                Ok((NotificationEvent::CounterOfferMade, Some(slot)))
            }

            NegotiationCommand::Reject => {
                next.status = AppointmentStatus::Rejected;
                Ok((
                    NotificationEvent::AppointmentRejected,
                    Some((next.original_request.date, next.original_request.time)),
                ))
            }

            NegotiationCommand::RejectCounterOffer => {
                let offer = next.counter_offer.take().ok_or_else(|| {
                    NegotiationError::Storage(
                        "Counter-offered appointment has no counter-offer on record".to_string(),
                    )
                })?;
                next.status = AppointmentStatus::Rejected;
                Ok((
                    NotificationEvent::AppointmentRejected,
                    Some((offer.date, offer.time)),
                ))
            }

            NegotiationCommand::AcceptCounterOffer => {
                let offer = next.counter_offer.take().ok_or_else(|| {
                    NegotiationError::Storage(
                        "Counter-offered appointment has no counter-offer on record".to_string(),
                    )
                })?;
                let duration = offer.duration_minutes.unwrap_or(next.duration_minutes);
                next.confirmed_details = Some(ConfirmedSlot {
                    date: offer.date,
                    time: offer.time,
                    duration_minutes: duration,
                });
                next.duration_minutes = duration;
                next.status = AppointmentStatus::Confirmed;
                Ok((
                    NotificationEvent::AppointmentConfirmed,
                    Some((offer.date, offer.time)),
                ))
            }

            NegotiationCommand::Cancel => {
                let slot = if next.status == AppointmentStatus::Confirmed {
                    let settled = next.confirmed_details.take().ok_or_else(|| {
                        NegotiationError::Storage(
                            "Confirmed appointment has no settled details on record".to_string(),
                        )
                    })?;
                    if now >= settled.starts_at() {
                        return Err(NegotiationError::ConfirmedAppointmentElapsed);
                    }
                    (settled.date, settled.time)
                } else if let Some(offer) = next.counter_offer.take() {
                    (offer.date, offer.time)
                } else {
                    (next.original_request.date, next.original_request.time)
                };
                next.status = AppointmentStatus::Cancelled;
                Ok((NotificationEvent::AppointmentCancelled, Some(slot)))
            }
        }
    }

    fn build_offer(
        proposed_date: &Option<NaiveDate>,
        proposed_time: &Option<NaiveTime>,
        proposed_duration_minutes: &Option<i32>,
    ) -> Result<ProposedSlot, NegotiationError> {
        let (date, time) = match (proposed_date, proposed_time) {
            (Some(date), Some(time)) => (*date, *time),
            _ => {
                return Err(NegotiationError::Validation(
                    "A proposed date and time are required".to_string(),
                ));
            }
        };

        if let Some(duration) = proposed_duration_minutes {
            if *duration <= 0 {
                return Err(NegotiationError::Validation(
                    "Proposed duration must be a positive number of minutes".to_string(),
                ));
            }
        }

        Ok(ProposedSlot {
            date,
            time,
            duration_minutes: *proposed_duration_minutes,
        })
    }
}

impl Default for NegotiationEngine {
    fn default() -> Self {
        Self::new()
    }
}
