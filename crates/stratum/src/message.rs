use super::*;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Clone)]
#[serde(untagged)]
pub enum Id {
    Null,
    Number(u64),
    String(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Message {
    Request {
        id: Id,
        method: String,
        params: Value,
    },
    Response {
        id: Id,
        result: Option<Value>,
        error: Option<JsonRpcError>,
        #[serde(skip_serializing_if = "Option::is_none", rename = "reject-reason")]
        reject_reason: Option<String>,
    },
    Notification {
        method: String,
        params: Value,
    },
}

/// Pools send notifications with `"id": null` where JSON-RPC would omit the field, so both are
/// classified as notifications. A method call carrying a non-null id is a request that expects
/// a reply, such as `client.get_version`. Missing `params` read as null.
impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            id: Option<Id>,
            method: Option<String>,
            #[serde(default)]
            params: Value,
            #[serde(default)]
            result: Option<Value>,
            #[serde(default)]
            error: Option<JsonRpcError>,
            #[serde(default, rename = "reject-reason")]
            reject_reason: Option<String>,
        }

        let raw = Raw::deserialize(deserializer)?;

        match (raw.method, raw.id) {
            (Some(method), None | Some(Id::Null)) => Ok(Message::Notification {
                method,
                params: raw.params,
            }),
            (Some(method), Some(id)) => Ok(Message::Request {
                id,
                method,
                params: raw.params,
            }),
            (None, id)
                if id.is_some()
                    || raw.result.is_some()
                    || raw.error.is_some()
                    || raw.reject_reason.is_some() =>
            {
                Ok(Message::Response {
                    id: id.unwrap_or(Id::Null),
                    result: raw.result,
                    error: raw.error,
                    reject_reason: raw.reject_reason,
                })
            }
            (None, _) => Err(de::Error::custom("message has neither method nor id")),
        }
    }
}
