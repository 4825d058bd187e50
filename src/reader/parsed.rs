//! Structured resource entries rebuilt from an archive.

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::model::{ConfiguredValue, DependencyType, ParsedAndroidDataEntry, ResourceType};

/// Consumer of parsed entries, visited in archive order.
pub trait ResourceSink {
    fn accept(&mut self, entry: &ParsedAndroidDataEntry) -> Result<(), String>;
}

/// Parsed resources keyed by `(type, name)`, in first-seen order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedAndroidData {
    entries: IndexMap<(ResourceType, String), ParsedAndroidDataEntry>,
}

impl ParsedAndroidData {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, ty: ResourceType, name: &str) -> Option<&ParsedAndroidDataEntry> {
        self.entries.get(&(ty, name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedAndroidDataEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = (ResourceType, &str)> {
        self.entries.keys().map(|(ty, name)| (*ty, name.as_str()))
    }

    /// Stops at the first entry the sink rejects.
    pub fn write_resources_to(&self, sink: &mut impl ResourceSink) -> Result<(), String> {
        self.entries.values().try_for_each(|entry| sink.accept(entry))
    }
}

#[derive(Debug, Default)]
pub struct ParsedAndroidDataBuilder {
    data: ParsedAndroidData,
}

impl ParsedAndroidDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one configured value.
    ///
    /// A second value for the same `(type, qualifiers, name)` is rejected,
    /// except for `id`, where repeated declarations are the same resource.
    pub fn add(
        &mut self,
        ty: ResourceType,
        name: &str,
        provenance: DependencyType,
        value: ConfiguredValue,
    ) -> Result<(), String> {
        match self.data.entries.entry((ty, name.to_string())) {
            Entry::Vacant(slot) => {
                slot.insert(ParsedAndroidDataEntry {
                    ty,
                    name: name.to_string(),
                    provenance,
                    values: vec![value],
                });
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if entry.provenance != provenance {
                    return Err(format!(
                        "{ty}/{name} seen as both {:?} and {provenance:?}",
                        entry.provenance
                    ));
                }
                match entry.values.iter().position(|v| v.qualifiers == value.qualifiers) {
                    Some(_) if ty == ResourceType::Id => {}
                    Some(existing) => {
                        return Err(format!(
                            "duplicate {ty}/{name}{} declared in {} and {}",
                            qualifier_suffix(&value.qualifiers),
                            entry.values[existing].source,
                            value.source
                        ));
                    }
                    None => entry.values.push(value),
                }
            }
        }
        Ok(())
    }

    pub fn build(self) -> ParsedAndroidData {
        self.data
    }
}

fn qualifier_suffix(qualifiers: &str) -> String {
    if qualifiers.is_empty() {
        String::new()
    } else {
        format!(" ({qualifiers})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(qualifiers: &str, source: &str) -> ConfiguredValue {
        ConfiguredValue {
            qualifiers: qualifiers.into(),
            source: source.into(),
            len: 0,
            payload: None,
        }
    }

    #[test]
    fn qualified_variants_share_one_entry() {
        let mut b = ParsedAndroidDataBuilder::new();
        b.add(ResourceType::String, "hi", DependencyType::Primary, value("", "values/s.xml"))
            .unwrap();
        b.add(ResourceType::String, "hi", DependencyType::Primary, value("fr", "values-fr/s.xml"))
            .unwrap();
        let data = b.build();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get(ResourceType::String, "hi").unwrap().values.len(), 2);
    }

    #[test]
    fn same_configuration_twice_is_an_error() {
        let mut b = ParsedAndroidDataBuilder::new();
        b.add(ResourceType::Color, "c", DependencyType::Primary, value("", "values/a.xml"))
            .unwrap();
        let err = b
            .add(ResourceType::Color, "c", DependencyType::Primary, value("", "values/b.xml"))
            .unwrap_err();
        assert!(err.contains("values/a.xml") && err.contains("values/b.xml"), "got {err}");
    }

    #[test]
    fn repeated_ids_collapse() {
        let mut b = ParsedAndroidDataBuilder::new();
        b.add(ResourceType::Id, "title", DependencyType::Primary, value("", "layout/a.xml"))
            .unwrap();
        b.add(ResourceType::Id, "title", DependencyType::Primary, value("", "layout/b.xml"))
            .unwrap();
        let data = b.build();
        assert_eq!(data.get(ResourceType::Id, "title").unwrap().values.len(), 1);
    }

    #[test]
    fn keys_keep_insertion_order() {
        let mut b = ParsedAndroidDataBuilder::new();
        b.add(ResourceType::String, "z", DependencyType::Primary, value("", "v")).unwrap();
        b.add(ResourceType::Layout, "a", DependencyType::Primary, value("", "l")).unwrap();
        let data = b.build();
        let keys: Vec<_> = data.keys().collect();
        assert_eq!(keys, vec![(ResourceType::String, "z"), (ResourceType::Layout, "a")]);
    }
}
