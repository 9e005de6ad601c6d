// libs/negotiation-cell/src/services/intents.rs
use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::models::{Appointment, NotificationEvent, NotificationIntent, PartyRole};

/// Turns a successful transition into the notifications it owes the other
/// side. Deterministic and side-effect free; actually sending anything is the
/// relay's job.
pub struct NotificationIntentEmitter;

impl NotificationIntentEmitter {
    pub fn new() -> Self {
        Self
    }

    /// One intent per interested party. The acting party already knows what
    /// they did, so today that is always exactly the counterpart.
    pub fn emit(
        &self,
        event: NotificationEvent,
        appointment: &Appointment,
        acting_role: &PartyRole,
        slot: Option<(NaiveDate, NaiveTime)>,
    ) -> Vec<NotificationIntent> {
        let (recipient_role, recipient_id) = appointment.counterpart_of(acting_role);

        debug!(
            "Emitting {} for appointment {} to {} {}",
            event,
            appointment.id(),
            recipient_role,
            recipient_id
        );

        vec![NotificationIntent {
            recipient_role,
            recipient_id,
            event,
            appointment_id: appointment.id(),
            slot_date: slot.map(|(date, _)| date),
            slot_time: slot.map(|(_, time)| time),
        }]
    }
}

impl Default for NotificationIntentEmitter {
    fn default() -> Self {
        Self::new()
    }
}
