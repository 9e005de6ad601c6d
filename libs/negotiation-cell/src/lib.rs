// libs/negotiation-cell/src/lib.rs
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;

pub use error::NegotiationError;
pub use models::{
    Actor, Appointment, AppointmentMessage, AppointmentStatus, ConfirmedSlot,
    CreateAppointmentRequest, ListAppointmentsQuery, NegotiationCommand, NotificationEvent,
    NotificationIntent, PartyRole, ProposedSlot, SlotRequest, SubmitTransitionRequest,
    TransitionOutcome,
};
pub use repository::{
    AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository,
};
pub use router::negotiation_routes;
pub use services::{
    NegotiationEngine, NegotiationService, NotificationIntentEmitter, NotificationRelayService,
};
