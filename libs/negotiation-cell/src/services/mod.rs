// libs/negotiation-cell/src/services/mod.rs
pub mod engine;
pub mod intents;
pub mod negotiation;
pub mod relay;

pub use engine::NegotiationEngine;
pub use intents::NotificationIntentEmitter;
pub use negotiation::NegotiationService;
pub use relay::NotificationRelayService;
