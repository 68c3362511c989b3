use super::*;

/// `mining.set_extranonce` params. Applies to jobs notified after it.
#[derive(Debug, Clone, PartialEq)]
pub struct SetExtranonce {
    pub extranonce1: Extranonce,
    pub extranonce2_size: usize,
}

impl<'de> Deserialize<'de> for SetExtranonce {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (extranonce1, extranonce2_size) = <(Extranonce, usize)>::deserialize(deserializer)?;

        if extranonce1.is_empty() {
            return Err(de::Error::custom("extranonce1 must not be empty"));
        }

        Ok(SetExtranonce {
            extranonce1,
            extranonce2_size,
        })
    }
}
