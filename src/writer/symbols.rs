//! Symbol ID assignment shared by both symbol sinks.

use indexmap::IndexMap;

use crate::model::{ParsedAndroidDataEntry, ResourceType};
use crate::reader::parsed::{ParsedAndroidData, ResourceSink};

/// `(type, name) -> id`, grouped by type in first-seen order.
///
/// IDs come from one counter shared by all types, so every symbol has a
/// distinct value and the numbering follows the archive's entry order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SymbolTable {
    types: IndexMap<ResourceType, IndexMap<String, u32>>,
    /// Declared name behind each sanitized symbol.
    declared: IndexMap<(ResourceType, String), String>,
    next_id: u32,
}

impl SymbolTable {
    pub fn from_parsed(data: &ParsedAndroidData) -> Result<Self, String> {
        let mut table = Self::default();
        data.write_resources_to(&mut table)?;
        Ok(table)
    }

    /// Returns the existing ID if the symbol was already seen.
    ///
    /// Two declared names that sanitize to the same field name, such as
    /// `Theme.App` and `Theme_App`, cannot both be represented and are
    /// rejected.
    pub fn insert(&mut self, ty: ResourceType, name: &str) -> Result<u32, String> {
        let symbol = symbol_name(name);
        if let Some(existing) = self.declared.get(&(ty, symbol.clone())) {
            if existing != name {
                return Err(format!(
                    "{ty}/{existing} and {ty}/{name} both map to the symbol {symbol}"
                ));
            }
        }
        let names = self.types.entry(ty).or_default();
        if let Some(id) = names.get(&symbol) {
            return Ok(*id);
        }
        let id = self.next_id;
        names.insert(symbol.clone(), id);
        self.declared.insert((ty, symbol), name.to_string());
        self.next_id += 1;
        Ok(id)
    }

    pub fn get(&self, ty: ResourceType, name: &str) -> Option<u32> {
        self.types.get(&ty)?.get(&symbol_name(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.next_id as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    /// Types in first-seen order with their symbols.
    pub fn types(&self) -> impl Iterator<Item = (ResourceType, &IndexMap<String, u32>)> {
        self.types.iter().map(|(ty, names)| (*ty, names))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, &str, u32)> {
        self.types()
            .flat_map(|(ty, names)| names.iter().map(move |(n, id)| (ty, n.as_str(), *id)))
    }
}

impl ResourceSink for SymbolTable {
    fn accept(&mut self, entry: &ParsedAndroidDataEntry) -> Result<(), String> {
        self.insert(entry.ty, &entry.name).map(|_| ())
    }
}

/// Field name used in generated code: `Theme.App` becomes `Theme_App`,
/// `android:textColor` becomes `android_textColor`.
pub fn symbol_name(name: &str) -> String {
    name.replace(['.', ':'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_shared_across_types_in_first_seen_order() {
        let mut table = SymbolTable::default();
        assert_eq!(table.insert(ResourceType::String, "app_name"), Ok(0));
        assert_eq!(table.insert(ResourceType::Layout, "main"), Ok(1));
        assert_eq!(table.insert(ResourceType::String, "title"), Ok(2));
        assert_eq!(table.insert(ResourceType::String, "app_name"), Ok(0));

        let flat: Vec<_> = table.iter().collect();
        assert_eq!(
            flat,
            vec![
                (ResourceType::String, "app_name", 0),
                (ResourceType::String, "title", 2),
                (ResourceType::Layout, "main", 1),
            ]
        );
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn dotted_name_sanitized_once() {
        let mut table = SymbolTable::default();
        let a = table.insert(ResourceType::Style, "Theme.App").unwrap();
        assert_eq!(table.insert(ResourceType::Style, "Theme.App"), Ok(a));
        assert_eq!(table.get(ResourceType::Style, "Theme.App"), Some(a));
        assert_eq!(table.iter().next().unwrap().1, "Theme_App");
    }

    #[test]
    fn colliding_sanitized_names_rejected() {
        let mut table = SymbolTable::default();
        table.insert(ResourceType::Style, "Theme.App").unwrap();
        let err = table.insert(ResourceType::Style, "Theme_App").unwrap_err();
        assert!(err.contains("Theme.App") && err.contains("Theme_App"), "got {err}");
        assert_eq!(table.len(), 1);

        // Same field name under another type is a different symbol.
        assert_eq!(table.insert(ResourceType::Attr, "Theme_App"), Ok(1));
    }
}
