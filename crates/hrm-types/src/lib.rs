//! Shared value types for HRM.
//!
//! The transport layer authenticates callers; this crate only guarantees that the identity it
//! hands over is usable as a map key (non-blank, stored verbatim).

/// Errors that can occur when creating an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The input was empty or contained only whitespace
    #[error("identity cannot be empty")]
    Empty,
}

/// An authenticated principal: a doctor, a patient, or any caller account.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is stored exactly as given, so `"P1"` and `" P1"` are different identities. No
/// other format is imposed, so account addresses, email addresses and opaque ids are all accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(String);

impl Identity {
    /// Creates a new `Identity` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(IdentityError::Empty)` if the input is empty or only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdentityError> {
        let input = input.as_ref();
        if input.trim().is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Identity::new(&s).map_err(serde::de::Error::custom)
    }
}
