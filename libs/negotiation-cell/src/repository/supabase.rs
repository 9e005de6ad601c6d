// libs/negotiation-cell/src/repository/supabase.rs
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::error::NegotiationError;
use crate::models::{Appointment, AppointmentStatus, PartyRole};
use crate::repository::AppointmentRepository;

const MAX_READ_ATTEMPTS: u32 = 3;

/// Appointment storage backed by the Supabase REST API.
///
/// Optimistic concurrency rides on PostgREST filters: updates are issued
/// against `id=eq.{id}&version=eq.{expected}`, so a row whose version has
/// moved on matches nothing and the write is a no-op we can detect.
pub struct SupabaseAppointmentRepository {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseAppointmentRepository {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            auth_token: auth_token.to_string(),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }

    /// GET returning raw rows, retried a bounded number of times. Reads are
    /// idempotent, so replaying one after a transient failure is safe.
    async fn fetch_rows(&self, path: &str) -> Result<Vec<Value>, NegotiationError> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_READ_ATTEMPTS {
            match self
                .supabase
                .request::<Vec<Value>>(Method::GET, path, Some(&self.auth_token), None)
                .await
            {
                Ok(rows) => return Ok(rows),
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < MAX_READ_ATTEMPTS {
                        warn!(
                            "Appointment read attempt {} failed, retrying: {}",
                            attempt, last_error
                        );
                        tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                    }
                }
            }
        }

        Err(NegotiationError::Storage(last_error))
    }

    fn parse_row(row: Value) -> Result<Appointment, NegotiationError> {
        serde_json::from_value(row).map_err(|e| {
            NegotiationError::Storage(format!("Failed to parse appointment record: {}", e))
        })
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn load(&self, id: Uuid) -> Result<Appointment, NegotiationError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows = self.fetch_rows(&path).await?;

        match rows.into_iter().next() {
            Some(row) => Self::parse_row(row),
            None => Err(NegotiationError::NotFound),
        }
    }

    async fn insert(&self, appointment: &Appointment) -> Result<(), NegotiationError> {
        let body = serde_json::to_value(appointment).map_err(|e| {
            NegotiationError::Storage(format!("Failed to serialize appointment: {}", e))
        })?;

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(&self.auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| NegotiationError::Storage(e.to_string()))?;

        if rows.is_empty() {
            return Err(NegotiationError::Storage(
                "Appointment insert returned no record".to_string(),
            ));
        }

        info!("Stored new appointment {}", appointment.id());
        Ok(())
    }

    #[instrument(skip(self, appointment))]
    async fn compare_and_save(
        &self,
        appointment: &Appointment,
        expected_version: i64,
    ) -> Result<(), NegotiationError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&version=eq.{}",
            appointment.id(),
            expected_version
        );
        let body = serde_json::to_value(appointment).map_err(|e| {
            NegotiationError::Storage(format!("Failed to serialize appointment: {}", e))
        })?;

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(&self.auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| NegotiationError::Storage(e.to_string()))?;

        if rows.is_empty() {
            // Nothing matched the version filter. Either the row is gone or
            // another writer bumped the version first; a plain fetch tells
            // us which, and what the version is now.
            let current = self.load(appointment.id()).await?;
            warn!(
                "Version conflict on appointment {}: expected {}, found {}",
                appointment.id(),
                expected_version,
                current.version()
            );
            return Err(NegotiationError::ConcurrencyConflict {
                expected: expected_version,
                actual: current.version(),
            });
        }

        info!(
            "Appointment {} advanced to version {}",
            appointment.id(),
            appointment.version()
        );
        Ok(())
    }

    async fn list_by_party(
        &self,
        role: &PartyRole,
        party_id: Uuid,
        status: Option<&AppointmentStatus>,
    ) -> Result<Vec<Appointment>, NegotiationError> {
        let mut query_parts = vec![match role {
            PartyRole::Patient => format!("patient_id=eq.{}", party_id),
            PartyRole::Clinic => format!("clinic_id=eq.{}", party_id),
        }];

        if let Some(status) = status {
            query_parts.push(format!("status=eq.{}", status));
        }

        query_parts.push("order=last_activity_at.desc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let rows = self.fetch_rows(&path).await?;

        rows.into_iter().map(Self::parse_row).collect()
    }
}
