use super::path::FieldPath;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Logical-name to wire-name alias table for one record type.
///
/// Built once per type (usually behind a `lazy_static!`) and applied to a
/// predicate through [`crate::Expr::remap`] before it is compiled or
/// evaluated, so no lookup happens per record. Unmapped names pass through.
#[derive(Clone, Debug, Default)]
pub struct FieldMap {
    aliases: FxHashMap<SmolStr, SmolStr>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, logical: &str, wire: &str) -> Self {
        self.insert(logical, wire);
        self
    }

    pub fn insert(&mut self, logical: &str, wire: &str) {
        self.aliases.insert(SmolStr::new(logical), SmolStr::new(wire));
    }

    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, SmolStr::as_str)
    }

    /// Each segment is mapped independently.
    pub fn resolve_path(&self, path: &FieldPath) -> FieldPath {
        FieldPath(
            path.segments()
                .iter()
                .map(|seg| {
                    self.aliases
                        .get(seg)
                        .cloned()
                        .unwrap_or_else(|| seg.clone())
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut map = FieldMap::new();
        for (logical, wire) in iter {
            map.insert(logical, wire);
        }
        map
    }
}

/// A typed entity set whose field aliases are known statically.
pub trait Entity {
    /// Entity set name used as the request path.
    const ENTITY_SET: &'static str;

    fn field_map() -> &'static FieldMap;
}
