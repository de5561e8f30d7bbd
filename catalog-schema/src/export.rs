use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full catalog snapshot served by `GET /api/json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CatalogExport {
    pub categories: Vec<ExportCategory>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExportCategory {
    pub id: i64,
    pub name: String,
    /// Username of the owning user.
    pub owner: String,
    pub items: Vec<ExportItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExportItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub owner: String,
}

impl CatalogExport {
    /// Nest items under their categories.
    ///
    /// `categories` keep their given order; items are attached in the order given, keyed by
    /// `category_id`. Items whose category is absent from `categories` are dropped.
    pub fn assemble<C, I>(categories: C, items: I) -> Self
    where
        C: IntoIterator<Item = ExportCategory>,
        I: IntoIterator<Item = (i64, ExportItem)>,
    {
        let mut by_category: BTreeMap<i64, Vec<ExportItem>> = BTreeMap::new();
        for (category_id, item) in items {
            by_category.entry(category_id).or_default().push(item);
        }

        let categories = categories
            .into_iter()
            .map(|mut category| {
                if let Some(items) = by_category.remove(&category.id) {
                    category.items.extend(items);
                }
                category
            })
            .collect();

        Self { categories }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, name: &str) -> ExportCategory {
        ExportCategory {
            id,
            name: name.to_string(),
            owner: "alice".to_string(),
            items: Vec::new(),
        }
    }

    fn item(id: i64, title: &str) -> ExportItem {
        ExportItem {
            id,
            title: title.to_string(),
            description: String::new(),
            owner: "bob".to_string(),
        }
    }

    #[test]
    fn assemble_nests_items_under_their_category() {
        let export = CatalogExport::assemble(
            vec![category(1, "Books"), category(2, "Games")],
            vec![(2, item(10, "Chess")), (1, item(11, "Dune")), (2, item(12, "Go"))],
        );

        assert_eq!(export.categories.len(), 2);
        assert_eq!(export.categories[0].name, "Books");
        assert_eq!(export.categories[0].items, vec![item(11, "Dune")]);
        assert_eq!(
            export.categories[1].items,
            vec![item(10, "Chess"), item(12, "Go")]
        );
    }

    #[test]
    fn assemble_drops_items_without_category() {
        let export = CatalogExport::assemble(vec![category(1, "Books")], vec![(9, item(1, "x"))]);
        assert!(export.categories[0].items.is_empty());
    }

    #[test]
    fn export_serializes_fixed_field_set() {
        let export = CatalogExport::assemble(vec![category(1, "Books")], vec![(1, item(3, "Dune"))]);
        let value = serde_json::to_value(&export).expect("serializes");
        assert_eq!(
            value,
            serde_json::json!({
                "categories": [{
                    "id": 1,
                    "name": "Books",
                    "owner": "alice",
                    "items": [{ "id": 3, "title": "Dune", "description": "", "owner": "bob" }]
                }]
            })
        );
    }
}
