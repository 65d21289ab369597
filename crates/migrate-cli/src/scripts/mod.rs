//! Migration scripts bundled with `csmig`.
//!
//! Each script keeps its own source text so diagnostics can show the
//! offending lines without the source tree being present.

use migrate_core::{script, FnScript, MigrationScript};

mod create_blog;
mod edit_blog;
mod extract_authors;
mod normalize_urls;

#[derive(Debug)]
pub struct CatalogEntry {
    pub script: FnScript,
    pub description: &'static str,
    pub file: &'static str,
    pub source: &'static str,
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        self.script.name()
    }
}

/// Bundled scripts in the order `--all` runs them.
pub fn catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            script: script("create_blog", create_blog::run),
            description: "Create the blog content type",
            file: create_blog::FILE,
            source: include_str!("create_blog.rs"),
        },
        CatalogEntry {
            script: script("edit_blog", edit_blog::run),
            description: "Add a summary field to blog and rename its title",
            file: edit_blog::FILE,
            source: include_str!("edit_blog.rs"),
        },
        CatalogEntry {
            script: script("normalize_urls", normalize_urls::run),
            description: "Rebuild blog entry URLs from their titles",
            file: normalize_urls::FILE,
            source: include_str!("normalize_urls.rs"),
        },
        CatalogEntry {
            script: script("extract_authors", extract_authors::run),
            description: "Move blog author names into linked author entries",
            file: extract_authors::FILE,
            source: include_str!("extract_authors.rs"),
        },
    ]
}

/// Source text for a diagnostic's file: a bundled script, or the file on
/// disk when it is readable.
pub fn source_for(catalog: &[CatalogEntry], file: &str) -> Option<String> {
    catalog
        .iter()
        .find(|e| e.file == file || file.ends_with(e.file) || e.file.ends_with(file))
        .map(|e| e.source.to_string())
        .or_else(|| std::fs::read_to_string(file).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let catalog = catalog();
        let mut names: Vec<&str> = catalog.iter().map(CatalogEntry::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), catalog.len());
    }

    #[test]
    fn bundled_source_matches_file() {
        let catalog = catalog();
        for entry in &catalog {
            assert!(entry.file.ends_with(".rs"), "{}", entry.file);
            assert!(entry.source.contains("pub async fn run"));
            assert_eq!(source_for(&catalog, entry.file).as_deref(), Some(entry.source));
        }
    }
}
