//! Entity storage.
//!
//! Parsed entities are kept per file and indexed by natural key. The store
//! performs no validation; displaced duplicates are remembered so a rule can
//! report them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use gtfs_model::{EntityKey, ParsedEntity, SchemaModel};

/// An entity that was replaced by a later row with the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacedEntity {
    pub key: EntityKey,
    /// Row that now holds the key.
    pub kept_row: u64,
    /// Row that was overwritten.
    pub displaced_row: u64,
}

/// Capability set the rule engine needs from an entity store.
pub trait GtfsDataRepository: Send + Sync {
    /// Insert or overwrite by natural key. Returns the displaced entity.
    fn add_entity(&self, entity: ParsedEntity) -> Option<Arc<ParsedEntity>>;

    /// `None` when nothing was stored under the key.
    fn get_by_key(&self, filename: &str, key: &EntityKey) -> Option<Arc<ParsedEntity>>;

    /// All entities of a file, in row order.
    fn get_all(&self, filename: &str) -> Vec<Arc<ParsedEntity>>;

    /// Entities overwritten by a later row with the same key.
    fn displaced(&self, filename: &str) -> Vec<DisplacedEntity>;

    /// Mark a file as fully populated.
    fn mark_loaded(&self, filename: &str);

    fn loaded_files(&self) -> BTreeSet<String>;

    fn is_loaded(&self, filename: &str) -> bool {
        self.loaded_files().contains(filename)
    }

    fn count(&self, filename: &str) -> usize {
        self.get_all(filename).len()
    }

    /// Entities grouped by the text of `group_field`, each group ordered by
    /// the integer `order_field`. Entities missing either value are left out.
    fn get_grouped(
        &self,
        filename: &str,
        group_field: &str,
        order_field: &str,
    ) -> BTreeMap<String, Vec<Arc<ParsedEntity>>> {
        let mut groups: BTreeMap<String, Vec<Arc<ParsedEntity>>> = BTreeMap::new();
        for entity in self.get_all(filename) {
            if entity.integer(order_field).is_none() {
                continue;
            }
            if let Some(group) = entity.display(group_field) {
                groups.entry(group).or_default().push(entity);
            }
        }
        for members in groups.values_mut() {
            members.sort_by_key(|entity| (entity.integer(order_field), entity.csv_row_number));
        }
        groups
    }
}

#[derive(Debug, Default)]
struct FileTable {
    by_key: BTreeMap<EntityKey, Arc<ParsedEntity>>,
    displaced: Vec<DisplacedEntity>,
}

/// Default in-memory adapter.
///
/// Each file has its own lock, so files can be populated concurrently.
#[derive(Debug, Default)]
pub struct InMemoryGtfsDataRepository {
    key_fields: BTreeMap<String, Vec<String>>,
    tables: RwLock<BTreeMap<String, Arc<RwLock<FileTable>>>>,
    loaded: RwLock<BTreeSet<String>>,
}

impl InMemoryGtfsDataRepository {
    /// Natural keys come from the schema; undeclared files are keyed by row.
    pub fn new(schema: &SchemaModel) -> Self {
        let key_fields = schema
            .files
            .iter()
            .map(|file| (file.filename.clone(), file.key.clone()))
            .collect();
        Self {
            key_fields,
            ..Self::default()
        }
    }

    pub fn key_for(&self, entity: &ParsedEntity) -> EntityKey {
        let fields = self
            .key_fields
            .get(&entity.filename)
            .map(Vec::as_slice)
            .unwrap_or_default();
        entity.key(fields)
    }

    fn table(&self, filename: &str) -> Option<Arc<RwLock<FileTable>>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(filename)
            .cloned()
    }

    fn table_or_create(&self, filename: &str) -> Arc<RwLock<FileTable>> {
        if let Some(table) = self.table(filename) {
            return table;
        }
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.entry(filename.to_string()).or_default().clone()
    }
}

impl GtfsDataRepository for InMemoryGtfsDataRepository {
    fn add_entity(&self, entity: ParsedEntity) -> Option<Arc<ParsedEntity>> {
        let key = self.key_for(&entity);
        let table = self.table_or_create(&entity.filename);
        let mut table = table.write().unwrap_or_else(PoisonError::into_inner);
        let kept_row = entity.csv_row_number;
        let previous = table.by_key.insert(key.clone(), Arc::new(entity));
        if let Some(previous) = &previous {
            table.displaced.push(DisplacedEntity {
                key,
                kept_row,
                displaced_row: previous.csv_row_number,
            });
        }
        previous
    }

    fn get_by_key(&self, filename: &str, key: &EntityKey) -> Option<Arc<ParsedEntity>> {
        let table = self.table(filename)?;
        let table = table.read().unwrap_or_else(PoisonError::into_inner);
        table.by_key.get(key).cloned()
    }

    fn get_all(&self, filename: &str) -> Vec<Arc<ParsedEntity>> {
        let Some(table) = self.table(filename) else {
            return Vec::new();
        };
        let mut entities: Vec<Arc<ParsedEntity>> = table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_key
            .values()
            .cloned()
            .collect();
        entities.sort_by_key(|entity| entity.csv_row_number);
        entities
    }

    fn displaced(&self, filename: &str) -> Vec<DisplacedEntity> {
        let Some(table) = self.table(filename) else {
            return Vec::new();
        };
        table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .displaced
            .clone()
    }

    fn mark_loaded(&self, filename: &str) {
        self.loaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(filename.to_string());
    }

    fn loaded_files(&self) -> BTreeSet<String> {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn count(&self, filename: &str) -> usize {
        let Some(table) = self.table(filename) else {
            return 0;
        };
        table.read().unwrap_or_else(PoisonError::into_inner).by_key.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_survive_a_poisoned_lock() {
        let store = InMemoryGtfsDataRepository::default();
        std::thread::scope(|scope| {
            let result = scope
                .spawn(|| {
                    let _guard = store.loaded.write();
                    panic!("writer panicked while holding the lock");
                })
                .join();
            assert!(result.is_err());
        });
        assert!(store.loaded.is_poisoned());

        store.mark_loaded("stops.txt");
        assert!(store.is_loaded("stops.txt"));
        assert!(
            store
                .add_entity(ParsedEntity::new("notes.txt", 2))
                .is_none()
        );
        assert_eq!(store.count("notes.txt"), 1);
    }
}
