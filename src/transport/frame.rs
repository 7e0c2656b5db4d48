//! STOMP 1.2 frame codec.
//!
//! A frame is a command line, header lines, a blank line, a body, and a NUL
//! terminator. A lone EOL is a heartbeat, not a frame; [`Frame::parse`]
//! returns `Ok(None)` for it. Malformed input is a
//! [`SyncError::Protocol`](crate::error::SyncError::Protocol).

use crate::error::{Result, SyncError};
use std::collections::HashMap;
use std::time::Duration;

/// Wire representation of a heartbeat.
pub const HEARTBEAT: &str = "\n";

/// STOMP protocol version this client speaks.
const STOMP_VERSION: &str = "1.2";

/// Frame commands used by this client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Message,
    Error,
    Disconnect,
}

impl Command {
    fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Message => "MESSAGE",
            Command::Error => "ERROR",
            Command::Disconnect => "DISCONNECT",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "CONNECT" => Ok(Command::Connect),
            "CONNECTED" => Ok(Command::Connected),
            "SUBSCRIBE" => Ok(Command::Subscribe),
            "UNSUBSCRIBE" => Ok(Command::Unsubscribe),
            "MESSAGE" => Ok(Command::Message),
            "ERROR" => Ok(Command::Error),
            "DISCONNECT" => Ok(Command::Disconnect),
            other => Err(SyncError::Protocol(format!(
                "unknown STOMP command: {:?}",
                other
            ))),
        }
    }
}

/// A decoded STOMP frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    /// CONNECT frame with version, heartbeat offer (`outgoing,incoming` in
    /// milliseconds) and the caller's extra headers (auth).
    pub fn connect(extra_headers: &HashMap<String, String>, heartbeat: (u64, u64)) -> Self {
        let mut headers = vec![
            ("accept-version".to_string(), STOMP_VERSION.to_string()),
            (
                "heart-beat".to_string(),
                format!("{},{}", heartbeat.0, heartbeat.1),
            ),
        ];
        for (name, value) in extra_headers {
            headers.push((name.clone(), value.clone()));
        }
        Frame {
            command: Command::Connect,
            headers,
            body: String::new(),
        }
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame {
            command: Command::Subscribe,
            headers: vec![
                ("id".to_string(), id.to_string()),
                ("destination".to_string(), destination.to_string()),
            ],
            body: String::new(),
        }
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame {
            command: Command::Unsubscribe,
            headers: vec![("id".to_string(), id.to_string())],
            body: String::new(),
        }
    }

    pub fn disconnect() -> Self {
        Frame {
            command: Command::Disconnect,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// First header with the given name, if any.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Encode to the wire form, NUL terminator included.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(&escape_header(name));
            out.push(':');
            out.push_str(&escape_header(value));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one frame from a WebSocket text message. `Ok(None)` means the
    /// message was a heartbeat.
    pub fn parse(input: &str) -> Result<Option<Frame>> {
        if input.is_empty() || input == "\n" || input == "\r\n" {
            return Ok(None);
        }
        let input = input
            .strip_suffix('\0')
            .ok_or_else(|| SyncError::Protocol("frame missing NUL terminator".to_string()))?;
        let (head, body) = match input.split_once("\r\n\r\n") {
            Some(parts) => parts,
            None => input
                .split_once("\n\n")
                .ok_or_else(|| SyncError::Protocol("frame missing header terminator".to_string()))?,
        };

        let mut lines = head.lines();
        let command_line = lines
            .next()
            .ok_or_else(|| SyncError::Protocol("frame missing command line".to_string()))?;
        let command = Command::parse(command_line.trim_end_matches('\r'))?;

        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            let (name, value) = line.split_once(':').ok_or_else(|| {
                SyncError::Protocol(format!("malformed header line: {:?}", line))
            })?;
            headers.push((unescape_header(name)?, unescape_header(value)?));
        }

        Ok(Some(Frame {
            command,
            headers,
            body: body.to_string(),
        }))
    }
}

/// Escape a header token per STOMP 1.2.
pub fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

/// Invert [`escape_header`]. Undefined escape sequences are a protocol error.
pub fn unescape_header(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(SyncError::Protocol(format!(
                    "invalid header escape: {:?}",
                    other
                )))
            }
        }
    }
    Ok(out)
}

/// Parse a `heart-beat` header value. A missing or unparsable header means
/// no heartbeats, which is the STOMP default of `0,0`.
pub fn parse_heartbeat(value: Option<&str>) -> (u64, u64) {
    match value.and_then(|v| v.split_once(',')) {
        Some((sx, sy)) => (
            sx.trim().parse().unwrap_or(0),
            sy.trim().parse().unwrap_or(0),
        ),
        None => (0, 0),
    }
}

/// Negotiate effective heartbeat intervals from the client offer `(cx, cy)`
/// and the server reply `(sx, sy)`, both in milliseconds.
///
/// Returns `(outgoing, incoming)`: how often we must send, and how often the
/// server will send. `None` on a side means heartbeats are disabled there.
pub fn negotiate_heartbeat(client: (u64, u64), server: (u64, u64)) -> (Option<Duration>, Option<Duration>) {
    let (cx, cy) = client;
    let (sx, sy) = server;
    let outgoing = if cx == 0 || sy == 0 {
        None
    } else {
        Some(Duration::from_millis(cx.max(sy)))
    };
    let incoming = if cy == 0 || sx == 0 {
        None
    } else {
        Some(Duration::from_millis(cy.max(sx)))
    };
    (outgoing, incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_subscribe_frame_wire_shape() {
        let frame = Frame::subscribe("create-thought", "/topic/retro-1.thoughts");
        assert_eq!(
            frame.encode(),
            "SUBSCRIBE\nid:create-thought\ndestination:/topic/retro-1.thoughts\n\n\0"
        );
    }

    #[test]
    fn test_connect_frame_carries_version_heartbeat_and_auth() {
        let mut extra = HashMap::new();
        extra.insert("Authorization".to_string(), "Bearer abc".to_string());
        let frame = Frame::connect(&extra, (4000, 4000));

        assert_eq!(frame.header("accept-version"), Some("1.2"));
        assert_eq!(frame.header("heart-beat"), Some("4000,4000"));
        assert_eq!(frame.header("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn test_parse_message_frame() {
        let wire = "MESSAGE\nsubscription:create-thought\nmessage-id:7\ndestination:/topic/r.thoughts\n\n{\"a\":1}\0";
        let frame = Frame::parse(wire).unwrap().unwrap();

        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.header("subscription"), Some("create-thought"));
        assert_eq!(frame.body, "{\"a\":1}");
    }

    #[test]
    fn test_parse_crlf_frame() {
        let wire = "CONNECTED\r\nversion:1.2\r\nheart-beat:4000,4000\r\n\r\n\0";
        let frame = Frame::parse(wire).unwrap().unwrap();

        assert_eq!(frame.command, Command::Connected);
        assert_eq!(frame.header("version"), Some("1.2"));
    }

    #[test]
    fn test_heartbeat_is_not_a_frame() {
        assert_eq!(Frame::parse("\n").unwrap(), None);
        assert_eq!(Frame::parse("\r\n").unwrap(), None);
        assert_eq!(Frame::parse("").unwrap(), None);
    }

    #[test]
    fn test_malformed_frames_are_protocol_errors() {
        assert!(Frame::parse("MESSAGE\n\nbody").is_err()); // no NUL
        assert!(Frame::parse("MESSAGE\nheader-no-colon\n\n\0").is_err());
        assert!(Frame::parse("BOGUS\n\n\0").is_err());
    }

    #[test]
    fn test_header_escaping_round_trips_specials() {
        let raw = "a:b\\c\nd\re";
        let escaped = escape_header(raw);
        assert!(!escaped.contains('\n'));
        assert!(!escaped.contains(':'));
        assert_eq!(unescape_header(&escaped).unwrap(), raw);
    }

    #[test]
    fn test_undefined_escape_rejected() {
        assert!(unescape_header("\\t").is_err());
        assert!(unescape_header("dangling\\").is_err());
    }

    #[test]
    fn test_heartbeat_negotiation() {
        // both sides active: the slower rate wins
        assert_eq!(
            negotiate_heartbeat((4000, 4000), (10000, 10000)),
            (
                Some(Duration::from_millis(10000)),
                Some(Duration::from_millis(10000))
            )
        );
        // server refuses to receive: we never send
        assert_eq!(negotiate_heartbeat((4000, 4000), (4000, 0)).0, None);
        // missing header parses as disabled
        assert_eq!(parse_heartbeat(None), (0, 0));
        assert_eq!(parse_heartbeat(Some("5000,0")), (5000, 0));
    }

    proptest! {
        #[test]
        fn prop_header_escape_round_trips(raw in any::<String>()) {
            let escaped = escape_header(&raw);
            prop_assert!(!escaped.contains('\n'));
            prop_assert!(!escaped.contains('\r'));
            prop_assert!(!escaped.contains(':'));
            prop_assert_eq!(unescape_header(&escaped).unwrap(), raw);
        }

        #[test]
        fn prop_subscribe_frame_round_trips(
            id in "[a-z-]{1,20}",
            destination in any::<String>(),
        ) {
            let frame = Frame::subscribe(&id, &destination);
            let parsed = Frame::parse(&frame.encode()).unwrap().unwrap();
            prop_assert_eq!(parsed, frame);
        }
    }
}
