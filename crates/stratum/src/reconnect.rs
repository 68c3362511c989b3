use super::*;

/// `client.reconnect` params: `[host, port, wait_seconds]`, every element optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconnect {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub wait: Option<u64>,
}

fn lenient_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Reconnect {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let params = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();

        Ok(Reconnect {
            host: params
                .first()
                .and_then(Value::as_str)
                .filter(|host| !host.is_empty())
                .map(str::to_owned),
            port: lenient_u64(params.get(1)).and_then(|port| u16::try_from(port).ok()),
            wait: lenient_u64(params.get(2)),
        })
    }
}
