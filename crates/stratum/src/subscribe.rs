use super::*;

#[derive(Debug, PartialEq)]
pub struct Subscribe {
    pub user_agent: String,
    pub extranonce1: Option<String>,
}

impl Serialize for Subscribe {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = if self.extranonce1.is_some() { 2 } else { 1 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.user_agent)?;
        if let Some(x1) = &self.extranonce1 {
            seq.serialize_element(x1)?;
        }
        seq.end()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct SubscribeResult {
    pub subscriptions: Vec<(String, String)>,
    pub extranonce1: Extranonce,
    pub extranonce2_size: usize,
}

impl Serialize for SubscribeResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.subscriptions)?;
        seq.serialize_element(&self.extranonce1)?;
        seq.serialize_element(&self.extranonce2_size)?;
        seq.end()
    }
}

/// Pools disagree on the shape of the subscription list and some omit the extranonce2 size,
/// so both are read leniently.
impl<'de> Deserialize<'de> for SubscribeResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Three(Value, Extranonce, usize),
            Two(Value, Extranonce),
        }

        let (subscriptions, extranonce1, extranonce2_size) = match Raw::deserialize(deserializer)? {
            Raw::Three(subscriptions, extranonce1, size) => (subscriptions, extranonce1, size),
            Raw::Two(subscriptions, extranonce1) => {
                (subscriptions, extranonce1, DEFAULT_EXTRANONCE2_SIZE)
            }
        };

        let subscriptions = match subscriptions {
            Value::Array(items) if items.iter().all(Value::is_array) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<(String, String)>(item).ok())
                .collect(),
            other => serde_json::from_value::<(String, String)>(other)
                .map(|pair| vec![pair])
                .unwrap_or_default(),
        };

        Ok(SubscribeResult {
            subscriptions,
            extranonce1,
            extranonce2_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq};

    #[test]
    fn subscribe_params() {
        assert_eq!(
            serde_json::to_value(Subscribe {
                user_agent: "solominer/0.1.0".into(),
                extranonce1: None,
            })
            .unwrap(),
            serde_json::json!(["solominer/0.1.0"])
        );
    }

    #[test]
    fn nested_subscriptions() {
        let result = serde_json::from_str::<SubscribeResult>(
            r#"[[["mining.set_difficulty","b4b6"],["mining.notify","ae68"]],"08000002",4]"#,
        )
        .unwrap();

        assert_eq!(
            result,
            SubscribeResult {
                subscriptions: vec![
                    ("mining.set_difficulty".into(), "b4b6".into()),
                    ("mining.notify".into(), "ae68".into()),
                ],
                extranonce1: "08000002".parse().unwrap(),
                extranonce2_size: 4,
            }
        );
    }

    #[test]
    fn flat_subscription_and_eight_byte_extranonce2() {
        let result =
            serde_json::from_str::<SubscribeResult>(r#"[["mining.notify","1"],"f000000a",8]"#)
                .unwrap();
        assert_eq!(result.subscriptions, vec![("mining.notify".into(), "1".into())]);
        assert_eq!(result.extranonce2_size, 8);
    }

    #[test]
    fn missing_extranonce2_size_defaults() {
        let result = serde_json::from_str::<SubscribeResult>(r#"[null,"abcd"]"#).unwrap();
        assert!(result.subscriptions.is_empty());
        assert_eq!(result.extranonce1.to_hex(), "abcd");
        assert_eq!(result.extranonce2_size, DEFAULT_EXTRANONCE2_SIZE);
    }

    #[test]
    fn rejects_bad_extranonce1() {
        assert!(serde_json::from_str::<SubscribeResult>(r#"[[],"xyz",4]"#).is_err());
        assert!(serde_json::from_str::<SubscribeResult>(r#"[[]]"#).is_err());
    }
}
