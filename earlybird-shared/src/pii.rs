use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A wrapper for sensitive strings (confirmation codes) that keeps them out of log output.
///
/// `Debug` and `Display` only show the last two characters, which is enough to tell
/// reservations apart in a multi-reservation run. Use [`Masked::expose`] where the real
/// value has to go over the wire.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> Masked<T> {
    pub fn expose(&self) -> &str {
        self.0.as_ref()
    }

    fn tail(&self) -> &str {
        let value = self.0.as_ref();
        let cut = value
            .char_indices()
            .rev()
            .nth(1)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        &value[cut..]
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked(****{})", self.tail())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "****{}", self.tail())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Masking is a logging concern; serialized forms carry the real value.
        self.0.serialize(serializer)
    }
}
