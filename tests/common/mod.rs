//! Shared test utilities for the modem engine tests.

#![allow(dead_code)]

use sms_modem::{MockModem, MockTransport, ModemSession};

/// Script the happy-path initialization handshake on a mock modem.
pub fn script_handshake(modem: &MockModem) {
    modem.reply_to("AT\r\n", &["OK"]);
    modem.reply_to("AT+CMGF=1\r\n", &["OK"]);
    modem.reply_to("AT+CNMI=2,2,0,0,0\r\n", &["OK"]);
}

/// Build a session connected to a scripted mock modem, already `Ready`.
pub async fn ready_session() -> (ModemSession, MockModem) {
    let (transport, modem) = MockTransport::new("MOCK0");
    script_handshake(&modem);

    let session = ModemSession::new();
    session
        .connect_transport(Box::new(transport))
        .await
        .expect("handshake against scripted modem");

    (session, modem)
}

/// The writes expected on the wire for a complete handshake, in order.
pub fn handshake_writes() -> Vec<String> {
    vec![
        "AT\r\n".to_string(),
        "AT+CMGF=1\r\n".to_string(),
        "AT+CNMI=2,2,0,0,0\r\n".to_string(),
    ]
}
