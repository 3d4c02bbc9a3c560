use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Member path into a record, `/`-separated as on the wire (`Customer/Name`).
/// The empty path is the current scope itself: the record at top level, or the
/// element inside an `any` lambda.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(pub Vec<SmolStr>);

impl FieldPath {
    pub fn new(s: &str) -> Self {
        if s.is_empty() {
            FieldPath(vec![])
        } else {
            FieldPath(s.split('/').map(SmolStr::new).collect())
        }
    }

    /// Path referring to the current scope.
    pub fn current() -> Self {
        FieldPath(vec![])
    }

    pub fn as_str(&self) -> String {
        self.0
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[SmolStr] {
        &self.0
    }
}

impl Serialize for FieldPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Ok(FieldPath::new(&s))
    }
}
