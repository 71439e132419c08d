use core::fmt::Write;

use serde::Serialize;

use crate::config::PAYLOAD_BUF_LEN;
use crate::error::PayloadError;

pub const BUTTON_PRESS: &str = "button_press";
pub const DEVICE_ID_PREFIX: &str = "nrf9151_";

/// Serialized event body, rebuilt for every send.
pub type EventPayload = heapless::String<PAYLOAD_BUF_LEN>;

// Field order is the wire order.
#[derive(Serialize)]
struct Event<'a> {
    event_type: &'a str,
    data: ButtonData<'a>,
}

#[derive(Serialize)]
struct ButtonData<'a> {
    button: u8,
    device_id: &'a str,
}

/// `{"event_type":"button_press","data":{"button":<button>,"device_id":"nrf9151_<device_id>"}}`
pub fn build_button_payload(button: u8, device_id: &str) -> Result<EventPayload, PayloadError> {
    // Anything longer than the whole body can't fit once serialized either
    let mut qualified_id = heapless::String::<PAYLOAD_BUF_LEN>::new();
    write!(qualified_id, "{DEVICE_ID_PREFIX}{device_id}").map_err(|_| PayloadError::Overflow)?;

    let event = Event {
        event_type: BUTTON_PRESS,
        data: ButtonData {
            button,
            device_id: &qualified_id,
        },
    };
    serde_json_core::to_string::<_, PAYLOAD_BUF_LEN>(&event).map_err(|_| PayloadError::Overflow)
}
