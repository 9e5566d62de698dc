//! Page store abstraction over the remote wiki.
//!
//! The batch driver only needs this minimal surface; the live MediaWiki
//! implementation lives in [`crate::mediawiki`], and [`MemoryStore`] backs
//! tests and offline experiments.

use std::collections::BTreeMap;

use crate::error::StoreError;

pub trait PageStore {
    /// Current text of the page. `NotFound` when the page does not exist,
    /// which is distinct from a transient fetch error.
    fn get_text(&mut self, title: &str) -> Result<String, StoreError>;

    /// Persist new text with a change comment.
    fn save_text(&mut self, title: &str, new_text: &str, comment: &str) -> Result<(), StoreError>;

    fn list_category_members(&mut self, category: &str) -> Result<Vec<String>, StoreError>;

    fn list_pages_referencing(&mut self, target: &str) -> Result<Vec<String>, StoreError>;

    fn page_exists(&mut self, title: &str) -> Result<bool, StoreError> {
        match self.get_text(title) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// In-memory store. Records every save so tests can assert on exactly what
/// would have been written.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pages: BTreeMap<String, String>,
    categories: BTreeMap<String, Vec<String>>,
    references: BTreeMap<String, Vec<String>>,
    pub saves: Vec<(String, String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_page(mut self, title: &str, text: &str) -> Self {
        self.pages.insert(title.to_string(), text.to_string());
        self
    }

    pub fn with_category(mut self, category: &str, members: &[&str]) -> Self {
        self.categories.insert(
            category.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn with_references(mut self, target: &str, referrers: &[&str]) -> Self {
        self.references.insert(
            target.to_string(),
            referrers.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn text(&self, title: &str) -> Option<&str> {
        self.pages.get(title).map(String::as_str)
    }
}

impl PageStore for MemoryStore {
    fn get_text(&mut self, title: &str) -> Result<String, StoreError> {
        self.pages
            .get(title)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                title: title.to_string(),
            })
    }

    fn save_text(&mut self, title: &str, new_text: &str, comment: &str) -> Result<(), StoreError> {
        self.pages.insert(title.to_string(), new_text.to_string());
        self.saves
            .push((title.to_string(), new_text.to_string(), comment.to_string()));
        Ok(())
    }

    fn list_category_members(&mut self, category: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.categories.get(category).cloned().unwrap_or_default())
    }

    fn list_pages_referencing(&mut self, target: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.references.get(target).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new().with_page("test", "old");
        assert_eq!(store.get_text("test").unwrap(), "old");
        assert!(store.page_exists("test").unwrap());
        assert!(!store.page_exists("missing").unwrap());

        store.save_text("test", "new", "an edit").unwrap();
        assert_eq!(store.get_text("test").unwrap(), "new");
        assert_eq!(store.saves.len(), 1);
        assert_eq!(store.saves[0].2, "an edit");
    }

    #[test]
    fn test_missing_page_is_not_found() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.get_text("absent"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_listings() {
        let mut store = MemoryStore::new()
            .with_category("English nouns", &["cat", "dog"])
            .with_references("Template:en-noun", &["cat"]);
        assert_eq!(
            store.list_category_members("English nouns").unwrap(),
            vec!["cat", "dog"]
        );
        assert_eq!(
            store.list_pages_referencing("Template:en-noun").unwrap(),
            vec!["cat"]
        );
        assert!(store.list_category_members("empty").unwrap().is_empty());
    }
}
