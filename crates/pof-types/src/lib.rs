use std::num::NonZeroU64;

/// Errors that can occur when creating a validated patient identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input text was not a plain run of decimal digits
    #[error("Identifier must be a decimal integer, got '{0}'")]
    Malformed(String),
    /// The value was zero or negative
    #[error("Identifier must be a positive integer, got {0}")]
    NotPositive(i64),
    /// The value does not fit in a signed 64-bit integer
    #[error("Identifier {0} is out of range")]
    OutOfRange(u64),
}

/// A patient identifier that is guaranteed to be a positive integer.
///
/// Identifiers are allocated by the repository starting at 1 and are never reused. Zero and
/// negative values cannot be represented, so any code holding a `PatientId` can rely on it
/// naming a valid (though not necessarily existing) record. The upper bound is `i64::MAX` so the
/// value always fits the signed `identifier` field of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatientId(NonZeroU64);

impl PatientId {
    /// The first identifier handed out by an empty repository.
    pub const FIRST: PatientId = PatientId(NonZeroU64::MIN);

    /// Creates a new `PatientId` from a signed integer.
    ///
    /// # Errors
    ///
    /// Returns `IdError::NotPositive` if `value` is zero or negative.
    pub fn new(value: i64) -> Result<Self, IdError> {
        u64::try_from(value)
            .ok()
            .and_then(NonZeroU64::new)
            .map(Self)
            .ok_or(IdError::NotPositive(value))
    }

    /// Parses an identifier from a URL path segment.
    ///
    /// The segment must consist solely of ASCII decimal digits: no sign, no surrounding
    /// whitespace, no fractional part or exponent.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Malformed` for anything that is not a digit run (including values too
    /// large for `u64`), `IdError::NotPositive` for zero and `IdError::OutOfRange` above
    /// `i64::MAX`.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::Malformed(input.to_owned()));
        }
        let value: u64 = input
            .parse()
            .map_err(|_| IdError::Malformed(input.to_owned()))?;
        Self::try_from(value)
    }

    /// Returns the identifier as a plain integer.
    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Returns the identifier as a signed integer. Always positive.
    pub fn as_i64(self) -> i64 {
        self.0.get() as i64
    }

    /// Returns the identifier that follows this one, or `None` once `i64::MAX` has been reached.
    pub fn checked_next(self) -> Option<Self> {
        Self::try_from(self.get() + 1).ok()
    }
}

impl TryFrom<u64> for PatientId {
    type Error = IdError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            return Err(IdError::OutOfRange(value));
        }
        NonZeroU64::new(value)
            .map(Self)
            .ok_or(IdError::NotPositive(0))
    }
}

impl From<PatientId> for u64 {
    fn from(id: PatientId) -> Self {
        id.get()
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PatientId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for PatientId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.get())
    }
}

impl<'de> serde::Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u64::deserialize(deserializer)?;
        PatientId::try_from(value).map_err(serde::de::Error::custom)
    }
}
