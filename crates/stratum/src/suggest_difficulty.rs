use super::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestDifficulty(pub Difficulty);

/// Params are a one-element array.
impl Serialize for SuggestDifficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.0,).serialize(serializer)
    }
}
