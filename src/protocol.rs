use std::fmt;

/// One inbound text frame from the device, tilde-delimited with the tag first.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceMessage {
    /// `scp~<response>` — SCPI response text for the log.
    Scpi(String),
    /// `swr~<value>` — standing wave ratio reading.
    Swr(f64),
    /// `led~<id>~<color>` — indicator color change.
    Led { id: u8, color: String },
    /// `btn~<id>~<true|false>~<color>` — button state echoed by the device.
    Button {
        id: u8,
        depressed: bool,
        color: String,
    },
    /// `bep~<freq>~<duration_ms>` — device-requested tone.
    Beep { frequency_hz: f32, duration_ms: u64 },
}

/// Outbound frames, panel to device.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    ButtonPressed(u8),
    ButtonReleased(u8),
    Scpi(String),
}

impl ClientMessage {
    pub fn encode(&self) -> String {
        match self {
            ClientMessage::ButtonPressed(id) => format!("btn~{id}~pressed"),
            ClientMessage::ButtonReleased(id) => format!("btn~{id}~released"),
            ClientMessage::Scpi(command) => format!("scp~{command}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParseError {
    /// No `~` separator at all; not a protocol frame.
    NoSeparator,
    /// Tag is not one of the five known tags. Forward-compatible no-op.
    UnknownTag(String),
    /// Fewer fields than the tag's arity requires.
    MissingField {
        tag: &'static str,
        expected: usize,
        found: usize,
    },
    InvalidNumber { tag: &'static str, field: String },
    InvalidBool { field: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NoSeparator => write!(f, "no tilde separator"),
            ParseError::UnknownTag(tag) => write!(f, "unknown tag {tag:?}"),
            ParseError::MissingField {
                tag,
                expected,
                found,
            } => write!(f, "{tag} frame needs {expected} fields, got {found}"),
            ParseError::InvalidNumber { tag, field } => {
                write!(f, "{tag} frame has non-numeric field {field:?}")
            }
            ParseError::InvalidBool { field } => {
                write!(f, "expected true or false, got {field:?}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses one inbound frame. Extra trailing fields are ignored; missing
/// fields are an error, never a partial apply.
pub fn parse_message(raw: &str) -> Result<DeviceMessage, ParseError> {
    if !raw.contains('~') {
        return Err(ParseError::NoSeparator);
    }
    let fields: Vec<&str> = raw.split('~').collect();
    match fields[0] {
        "scp" => {
            // SCPI responses may themselves contain tildes; keep the remainder intact.
            Ok(DeviceMessage::Scpi(fields[1..].join("~")))
        }
        "swr" => {
            let value = parse_num::<f64>("swr", arg("swr", &fields, 1, 2)?)?;
            if !value.is_finite() {
                return Err(ParseError::InvalidNumber {
                    tag: "swr",
                    field: fields[1].to_string(),
                });
            }
            Ok(DeviceMessage::Swr(value))
        }
        "led" => Ok(DeviceMessage::Led {
            id: parse_num::<u8>("led", arg("led", &fields, 1, 3)?)?,
            color: arg("led", &fields, 2, 3)?.to_string(),
        }),
        "btn" => Ok(DeviceMessage::Button {
            id: parse_num::<u8>("btn", arg("btn", &fields, 1, 4)?)?,
            depressed: parse_bool(arg("btn", &fields, 2, 4)?)?,
            color: arg("btn", &fields, 3, 4)?.to_string(),
        }),
        "bep" => {
            let frequency_hz = parse_num::<f32>("bep", arg("bep", &fields, 1, 3)?)?;
            if !frequency_hz.is_finite() {
                return Err(ParseError::InvalidNumber {
                    tag: "bep",
                    field: fields[1].to_string(),
                });
            }
            Ok(DeviceMessage::Beep {
                frequency_hz,
                duration_ms: parse_num::<u64>("bep", arg("bep", &fields, 2, 3)?)?,
            })
        }
        other => Err(ParseError::UnknownTag(other.to_string())),
    }
}

fn arg<'a>(
    tag: &'static str,
    fields: &'a [&str],
    index: usize,
    expected: usize,
) -> Result<&'a str, ParseError> {
    fields.get(index).copied().ok_or(ParseError::MissingField {
        tag,
        expected,
        found: fields.len() - 1,
    })
}

fn parse_num<T: std::str::FromStr>(tag: &'static str, field: &str) -> Result<T, ParseError> {
    field.parse().map_err(|_| ParseError::InvalidNumber {
        tag,
        field: field.to_string(),
    })
}

fn parse_bool(field: &str) -> Result<bool, ParseError> {
    match field {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ParseError::InvalidBool {
            field: other.to_string(),
        }),
    }
}
