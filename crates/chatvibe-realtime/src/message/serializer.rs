//! JSON encoding for WebSocket events.

use chatvibe_core::error::{AppError, ErrorKind};

use super::types::{InboundEvent, OutboundEvent};

/// Serialize an outbound event to JSON
pub fn serialize_outbound(event: &OutboundEvent) -> Result<String, AppError> {
    serde_json::to_string(event)
        .map_err(|e| AppError::with_source(ErrorKind::Serialization, "Failed to encode event", e))
}

/// Deserialize an inbound event from JSON.
///
/// Malformed frames are reported as validation errors.
pub fn deserialize_inbound(text: &str) -> Result<InboundEvent, AppError> {
    serde_json::from_str(text)
        .map_err(|e| AppError::validation(format!("Malformed event: {e}")))
}
