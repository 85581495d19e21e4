use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Event;

/// Envelope for a published event.
///
/// `subject_id` is the record the event is about (an account or a grant) and
/// `sequence_number` is the commit position assigned by the store, strictly
/// increasing across the whole directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    subject_id: Uuid,
    event_type: String,
    sequence_number: u64,
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    pub fn new(subject_id: Uuid, sequence_number: u64, payload: E) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            subject_id,
            event_type: payload.event_type().to_string(),
            sequence_number,
            payload,
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
