use super::*;

/// Parses up to eight hex digits into the 32-bit value they encode.
pub(crate) fn parse_word(s: &str, field: &str) -> Result<u32> {
    if s.is_empty() || s.len() > 8 {
        return Err(InternalError::Parse {
            message: format!("{field} '{s}': expected up to 8 hex digits"),
        });
    }

    u32::from_str_radix(s, 16).map_err(|err| InternalError::Parse {
        message: format!("{field} '{s}': {err}"),
    })
}

/// Header fields that travel as eight hex digits of their big-endian value.
macro_rules! hex_word {
    ($(#[$doc:meta])* $name:ident, $field:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
        pub struct $name(u32);

        impl FromStr for $name {
            type Err = InternalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_word(s, $field).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{:08x}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(word: $name) -> u32 {
                word.0
            }
        }
    };
}

hex_word!(
    /// The 32-bit header nonce.
    Nonce,
    "nonce"
);

hex_word!(
    /// Header timestamp as sent in `mining.notify` and echoed in `mining.submit`.
    Ntime,
    "ntime"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_big_endian_hex_of_header_value() {
        assert_eq!(Nonce::from(0x1dac2b7c).to_string(), "1dac2b7c");
        assert_eq!(Nonce::from(0).to_string(), "00000000");
        assert_eq!("ffffffff".parse::<Nonce>().unwrap(), Nonce::from(u32::MAX));
        assert_eq!(u32::from("504e86b9".parse::<Ntime>().unwrap()), 0x504e86b9);
        assert_eq!("86b9".parse::<Ntime>().unwrap(), Ntime::from(0x86b9));
    }

    #[test]
    fn wrong_width_is_rejected() {
        assert!("1ffffffff".parse::<Nonce>().is_err());
        assert!("000000001".parse::<Nonce>().is_err());
        assert!("".parse::<Ntime>().is_err());
        assert!("zzzzzzzz".parse::<Ntime>().is_err());
    }

    #[test]
    fn serde_uses_hex_strings() {
        assert_eq!(
            serde_json::to_value(Ntime::from(0x504e86b9)).unwrap(),
            serde_json::json!("504e86b9")
        );
        assert_eq!(
            serde_json::from_value::<Nonce>(serde_json::json!("00000007")).unwrap(),
            Nonce::from(7)
        );
    }
}
