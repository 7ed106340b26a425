use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A credential or secret whose value never shows up in `Debug`/`Display` output.
///
/// Used for the gateway API key, client id and intent client secrets so that
/// `tracing::debug!("{:?}", config)` and friends cannot leak them.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

const MASK: &str = "********";

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Wire payloads need the real value; only formatting is masked.
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    /// Borrow the secret. Call sites should be the places that put it on the wire.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Masked<String> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last four characters, for correlating log lines with a credential.
    pub fn hint(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 4 {
            return MASK.to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("...{}", tail)
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_masked() {
        let key = Masked::from("sk_live_very_secret");
        assert_eq!(format!("{:?}", key), "********");
        assert_eq!(format!("{}", key), "********");
        assert_eq!(key.expose(), "sk_live_very_secret");
    }

    #[test]
    fn test_hint_shows_only_tail() {
        assert_eq!(Masked::from("abcdef123456").hint(), "...3456");
        assert_eq!(Masked::from("abc").hint(), "********");
    }

    #[test]
    fn test_serde_is_transparent() {
        let key: Masked<String> = serde_json::from_str("\"client-1\"").unwrap();
        assert_eq!(key.expose(), "client-1");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"client-1\"");
    }
}
