use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use negotiation_cell::models::{NotificationEvent, NotificationIntent, PartyRole};
use negotiation_cell::services::NotificationRelayService;
use shared_utils::test_utils::TestConfig;

fn confirmed_intent() -> NotificationIntent {
    NotificationIntent {
        recipient_role: PartyRole::Patient,
        recipient_id: Uuid::new_v4(),
        event: NotificationEvent::AppointmentConfirmed,
        appointment_id: Uuid::new_v4(),
        slot_date: Some(NaiveDate::from_ymd_opt(2030, 5, 20).unwrap()),
        slot_time: Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
    }
}

#[tokio::test]
async fn test_intents_are_posted_to_the_gateway() {
    let mock_server = MockServer::start().await;
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.push_gateway_url = mock_server.uri();

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({
            "event": "AppointmentConfirmed",
            "recipient_role": "patient",
            "slot_date": "2030-05-20",
            "slot_time": "10:00:00"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({
            "event": "CounterOfferMade",
            "recipient_role": "clinic"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let counter_intent = NotificationIntent {
        recipient_role: PartyRole::Clinic,
        recipient_id: Uuid::new_v4(),
        event: NotificationEvent::CounterOfferMade,
        appointment_id: Uuid::new_v4(),
        slot_date: Some(NaiveDate::from_ymd_opt(2030, 5, 21).unwrap()),
        slot_time: Some(NaiveTime::from_hms_opt(15, 0, 0).unwrap()),
    };

    let relay = NotificationRelayService::new(&config);
    relay
        .deliver_all(vec![confirmed_intent(), counter_intent])
        .await;
}

#[tokio::test]
async fn test_gateway_failures_are_swallowed() {
    let mock_server = MockServer::start().await;
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.push_gateway_url = mock_server.uri();

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    // A broken gateway must not surface as an error to the caller
    let relay = NotificationRelayService::new(&config);
    relay.deliver_all(vec![confirmed_intent()]).await;
}

#[tokio::test]
async fn test_unconfigured_gateway_drops_quietly() {
    let test_config = TestConfig::default();
    let config = test_config.to_app_config();
    assert!(!config.is_push_configured());

    // No server is listening anywhere; nothing should be sent at all
    let relay = NotificationRelayService::new(&config);
    relay.deliver_all(vec![confirmed_intent()]).await;
}
