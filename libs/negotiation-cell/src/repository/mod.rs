// libs/negotiation-cell/src/repository/mod.rs
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::NegotiationError;
use crate::models::{Appointment, AppointmentStatus, PartyRole};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryAppointmentRepository;
pub use supabase::SupabaseAppointmentRepository;

/// Storage contract for appointments. The service layer only ever talks to
/// this trait; whether rows live in Postgres or a test HashMap is invisible
/// to the negotiation itself.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Fetches one appointment, or `NotFound`.
    async fn load(&self, id: Uuid) -> Result<Appointment, NegotiationError>;

    /// Stores a freshly created appointment. Fails if the id already exists.
    async fn insert(&self, appointment: &Appointment) -> Result<(), NegotiationError>;

    /// Persists an updated appointment atomically: the write only lands if
    /// the stored row still carries `expected_version`. Any concurrent writer
    /// that got there first turns this into `ConcurrencyConflict`.
    async fn compare_and_save(
        &self,
        appointment: &Appointment,
        expected_version: i64,
    ) -> Result<(), NegotiationError>;

    /// All appointments where the given party is on the given side, most
    /// recently active first, optionally narrowed to one status.
    async fn list_by_party(
        &self,
        role: &PartyRole,
        party_id: Uuid,
        status: Option<&AppointmentStatus>,
    ) -> Result<Vec<Appointment>, NegotiationError>;
}
