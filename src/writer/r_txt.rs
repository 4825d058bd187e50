//! Plain-text symbol table (`R.txt`).

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use super::atomic_write;
use super::symbols::SymbolTable;
use crate::error::Result;

/// One `int <type> <name> <id>` line per symbol, grouped by type.
pub fn render(table: &SymbolTable) -> String {
    let mut out = String::new();
    for (ty, name, id) in table.iter() {
        let _ = writeln!(out, "int {ty} {name} {id}");
    }
    out
}

pub fn write(table: &SymbolTable, path: &Path) -> Result<()> {
    atomic_write(path, render(table).as_bytes())?;
    info!(path = %path.display(), symbols = table.len(), "R.txt written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;

    #[test]
    fn lines_follow_assignment() {
        let mut table = SymbolTable::default();
        table.insert(ResourceType::String, "app_name").unwrap();
        table.insert(ResourceType::Layout, "main").unwrap();
        assert_eq!(render(&table), "int string app_name 0\nint layout main 1\n");
    }

    #[test]
    fn empty_table_renders_empty_file() {
        assert_eq!(render(&SymbolTable::default()), "");
    }
}
