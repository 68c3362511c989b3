use super::*;

pub type Result<T = (), E = InternalError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InternalError {
    #[snafu(display("invalid hex: {source}"))]
    Hex { source: hex::FromHexError },

    #[snafu(display("failed to parse {message}"))]
    Parse { message: String },

    #[snafu(display("invalid value: {reason}"))]
    InvalidValue { reason: String },
}

impl From<hex::FromHexError> for InternalError {
    fn from(source: hex::FromHexError) -> Self {
        Self::Hex { source }
    }
}

/// Stratum errors travel as `[code, message, traceback]` triples.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcError {
    pub error_code: i32,
    pub message: String,
    pub traceback: Option<Value>,
}

impl Serialize for JsonRpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.error_code, &self.message, &self.traceback).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonRpcError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Triple((i32, String, Option<Value>)),
            Pair((i32, String)),
            Object {
                code: i32,
                message: String,
                #[serde(default)]
                data: Option<Value>,
            },
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Triple((error_code, message, traceback)) => JsonRpcError {
                error_code,
                message,
                traceback,
            },
            Raw::Pair((error_code, message)) => JsonRpcError {
                error_code,
                message,
                traceback: None,
            },
            Raw::Object {
                code,
                message,
                data,
            } => JsonRpcError {
                error_code: code,
                message,
                traceback: data,
            },
            Raw::Text(message) => JsonRpcError {
                error_code: 20,
                message,
                traceback: None,
            },
        })
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stratum error {}: {}", self.error_code, self.message)
    }
}
