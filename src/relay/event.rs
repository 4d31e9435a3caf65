use serde_json::{Map, Value};

use crate::errors::RelayError;

// -----------------------------------------------------------------------------
// ----- ClientEvent -----------------------------------------------------------

/// A browser frame decoded as `{ "type": string, ...fields }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEvent {
    event_type: String,
    fields: Map<String, Value>,
}

// -----------------------------------------------------------------------------
// ----- ClientEvent: Static ---------------------------------------------------

impl ClientEvent {
    pub fn parse(frame: &[u8]) -> Result<Self, RelayError> {
        let value: Value =
            serde_json::from_slice(frame).map_err(|e| RelayError::malformed(frame, e.to_string()))?;

        let Value::Object(fields) = value else {
            return Err(RelayError::malformed(frame, "event is not a JSON object"));
        };

        let event_type = match fields.get("type") {
            Some(Value::String(t)) => t.clone(),
            Some(_) => return Err(RelayError::malformed(frame, "\"type\" is not a string")),
            None => return Err(RelayError::malformed(frame, "missing \"type\"")),
        };

        Ok(Self { event_type, fields })
    }
}

// -----------------------------------------------------------------------------
// ----- ClientEvent: Public ---------------------------------------------------

impl ClientEvent {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn into_parts(self) -> (String, Map<String, Value>) {
        (self.event_type, self.fields)
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
