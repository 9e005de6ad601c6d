// libs/negotiation-cell/src/repository/memory.rs
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::NegotiationError;
use crate::models::{Appointment, AppointmentStatus, PartyRole};
use crate::repository::AppointmentRepository;

/// HashMap-backed repository for tests and local development. The write lock
/// spans the whole version check and write, which gives the same at-most-one-
/// winner behavior the Supabase filter update provides.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    store: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn load(&self, id: Uuid) -> Result<Appointment, NegotiationError> {
        let store = self.store.read().await;
        store.get(&id).cloned().ok_or(NegotiationError::NotFound)
    }

    async fn insert(&self, appointment: &Appointment) -> Result<(), NegotiationError> {
        let mut store = self.store.write().await;
        if store.contains_key(&appointment.id()) {
            return Err(NegotiationError::Storage(format!(
                "Appointment {} already exists",
                appointment.id()
            )));
        }
        store.insert(appointment.id(), appointment.clone());
        Ok(())
    }

    async fn compare_and_save(
        &self,
        appointment: &Appointment,
        expected_version: i64,
    ) -> Result<(), NegotiationError> {
        let mut store = self.store.write().await;

        let current = store
            .get(&appointment.id())
            .ok_or(NegotiationError::NotFound)?;

        if current.version() != expected_version {
            return Err(NegotiationError::ConcurrencyConflict {
                expected: expected_version,
                actual: current.version(),
            });
        }

        store.insert(appointment.id(), appointment.clone());
        Ok(())
    }

    async fn list_by_party(
        &self,
        role: &PartyRole,
        party_id: Uuid,
        status: Option<&AppointmentStatus>,
    ) -> Result<Vec<Appointment>, NegotiationError> {
        let store = self.store.read().await;

        let mut matches: Vec<Appointment> = store
            .values()
            .filter(|appointment| appointment.involves(role, party_id))
            .filter(|appointment| status.map_or(true, |wanted| appointment.status() == wanted))
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.last_activity_at().cmp(&a.last_activity_at()));
        Ok(matches)
    }
}
