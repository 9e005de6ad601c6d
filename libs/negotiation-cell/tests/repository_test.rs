use assert_matches::assert_matches;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use negotiation_cell::models::{
    Actor, Appointment, AppointmentStatus, NegotiationCommand, PartyRole,
};
use negotiation_cell::repository::{
    AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository,
};
use negotiation_cell::services::NegotiationEngine;
use negotiation_cell::NegotiationError;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn creation_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 5, 1, 9, 0, 0).unwrap()
}

fn pending_appointment() -> Appointment {
    Appointment::create(
        Uuid::new_v4(),
        Uuid::new_v4(),
        NaiveDate::from_ymd_opt(2030, 5, 20).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        "cleaning".to_string(),
        30,
        creation_time(),
    )
    .unwrap()
}

/// The appointment after the clinic accepted it, version 1.
fn accepted(appointment: &Appointment) -> Appointment {
    let engine = NegotiationEngine::new();
    let clinic = Actor {
        role: PartyRole::Clinic,
        party_id: appointment.clinic_id(),
    };
    engine
        .apply(
            appointment,
            &clinic,
            &NegotiationCommand::Accept,
            appointment.version(),
            None,
            Utc.with_ymd_and_hms(2030, 5, 2, 9, 0, 0).unwrap(),
        )
        .unwrap()
        .appointment
}

// ==================== IN-MEMORY REPOSITORY ====================

#[tokio::test]
async fn test_memory_insert_and_load() {
    let repo = InMemoryAppointmentRepository::new();
    let appointment = pending_appointment();

    repo.insert(&appointment).await.unwrap();
    let loaded = repo.load(appointment.id()).await.unwrap();
    assert_eq!(loaded, appointment);

    let result = repo.load(Uuid::new_v4()).await;
    assert_matches!(result, Err(NegotiationError::NotFound));
}

#[tokio::test]
async fn test_memory_rejects_duplicate_inserts() {
    let repo = InMemoryAppointmentRepository::new();
    let appointment = pending_appointment();

    repo.insert(&appointment).await.unwrap();
    let result = repo.insert(&appointment).await;
    assert_matches!(result, Err(NegotiationError::Storage(_)));
}

#[tokio::test]
async fn test_memory_compare_and_save_guards_the_version() {
    let repo = InMemoryAppointmentRepository::new();
    let appointment = pending_appointment();
    repo.insert(&appointment).await.unwrap();

    let updated = accepted(&appointment);
    repo.compare_and_save(&updated, 0).await.unwrap();

    let stored = repo.load(appointment.id()).await.unwrap();
    assert_eq!(stored.version(), 1);
    assert_eq!(*stored.status(), AppointmentStatus::Confirmed);

    // A writer still holding version 0 must lose now
    let stale = accepted(&appointment);
    let result = repo.compare_and_save(&stale, 0).await;
    assert_matches!(
        result,
        Err(NegotiationError::ConcurrencyConflict {
            expected: 0,
            actual: 1
        })
    );

    // And the stored row still belongs to the winner
    let stored = repo.load(appointment.id()).await.unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn test_memory_compare_and_save_missing_row() {
    let repo = InMemoryAppointmentRepository::new();
    let appointment = pending_appointment();

    let result = repo.compare_and_save(&accepted(&appointment), 0).await;
    assert_matches!(result, Err(NegotiationError::NotFound));
}

// ==================== SUPABASE REPOSITORY ====================

#[tokio::test]
async fn test_supabase_load_parses_a_stored_row() {
    let mock_server = MockServer::start().await;
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::pending_appointment_row(
                &appointment_id.to_string(),
                &patient_id.to_string(),
                &clinic_id.to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let repo = SupabaseAppointmentRepository::new(&config, "test-token");
    let appointment = repo.load(appointment_id).await.unwrap();

    assert_eq!(appointment.id(), appointment_id);
    assert_eq!(appointment.patient_id(), patient_id);
    assert_eq!(appointment.clinic_id(), clinic_id);
    assert_eq!(*appointment.status(), AppointmentStatus::Pending);
    assert_eq!(appointment.version(), 0);
    assert_eq!(appointment.original_request().service_type, "cleaning");
}

#[tokio::test]
async fn test_supabase_load_missing_row_is_not_found() {
    let mock_server = MockServer::start().await;
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let repo = SupabaseAppointmentRepository::new(&config, "test-token");
    let result = repo.load(Uuid::new_v4()).await;
    assert_matches!(result, Err(NegotiationError::NotFound));
}

#[tokio::test]
async fn test_supabase_compare_and_save_uses_the_version_filter() {
    let mock_server = MockServer::start().await;
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let appointment = pending_appointment();
    let updated = accepted(&appointment);

    // The write must be filtered on both id and the expected version
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment.id())))
        .and(query_param("version", "eq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::confirmed_appointment_row(
                &appointment.id().to_string(),
                &appointment.patient_id().to_string(),
                &appointment.clinic_id().to_string(),
                NaiveDate::from_ymd_opt(2030, 5, 20).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let repo = SupabaseAppointmentRepository::new(&config, "test-token");
    repo.compare_and_save(&updated, 0).await.unwrap();
}

#[tokio::test]
async fn test_supabase_compare_and_save_conflict_reports_current_version() {
    let mock_server = MockServer::start().await;
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let appointment = pending_appointment();
    let updated = accepted(&appointment);

    // The filtered update matches nothing: someone got there first
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // The follow-up read shows the row at version 1
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment.id())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::counter_offered_appointment_row(
                &appointment.id().to_string(),
                &appointment.patient_id().to_string(),
                &appointment.clinic_id().to_string(),
                NaiveDate::from_ymd_opt(2030, 5, 21).unwrap(),
                NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            )
        ])))
        .mount(&mock_server)
        .await;

    let repo = SupabaseAppointmentRepository::new(&config, "test-token");
    let result = repo.compare_and_save(&updated, 0).await;
    assert_matches!(
        result,
        Err(NegotiationError::ConcurrencyConflict {
            expected: 0,
            actual: 1
        })
    );
}

#[tokio::test]
async fn test_supabase_compare_and_save_on_deleted_row() {
    let mock_server = MockServer::start().await;
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let appointment = pending_appointment();
    let updated = accepted(&appointment);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let repo = SupabaseAppointmentRepository::new(&config, "test-token");
    let result = repo.compare_and_save(&updated, 0).await;
    assert_matches!(result, Err(NegotiationError::NotFound));
}

#[tokio::test]
async fn test_supabase_list_filters_and_orders_server_side() {
    let mock_server = MockServer::start().await;
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let patient_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .and(query_param("status", "eq.pending"))
        .and(query_param("order", "last_activity_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::pending_appointment_row(
                &Uuid::new_v4().to_string(),
                &patient_id.to_string(),
                &clinic_id.to_string(),
            ),
            MockSupabaseResponses::pending_appointment_row(
                &Uuid::new_v4().to_string(),
                &patient_id.to_string(),
                &clinic_id.to_string(),
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let repo = SupabaseAppointmentRepository::new(&config, "test-token");
    let listed = repo
        .list_by_party(
            &PartyRole::Patient,
            patient_id,
            Some(&AppointmentStatus::Pending),
        )
        .await
        .unwrap();

    assert_eq!(listed.len(), 2);
    assert!(listed
        .iter()
        .all(|appointment| *appointment.status() == AppointmentStatus::Pending));
}
