//! # Entity Metadata
//!
//! Property-to-column resolution for criteria nodes. The compiler only depends on the
//! [`MetadataResolver`] trait; [`MetadataRegistry`] is the in-process implementation
//! that entity types register themselves with.

use dashmap::DashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A resolved column: physical name plus the entity property that maps onto it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub property: String,
    pub column: String,
    pub table: String,
    pub updatable: bool,
    pub primary_key: bool,
}

/// Table-level metadata for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub entity: String,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(entity: &str, table: &str) -> Self {
        Self {
            entity: entity.to_string(),
            table: table.to_string(),
            columns: Vec::new(),
        }
    }

    /// Table with no known columns; the entity name doubles as the table name
    pub fn bare(entity: &str) -> Self {
        Self::new(entity, entity)
    }

    /// Add the primary key column
    pub fn id(self, property: &str, column: &str) -> Self {
        self.push_column(property, column, false, true)
    }

    /// Add an updatable column
    pub fn column(self, property: &str, column: &str) -> Self {
        self.push_column(property, column, true, false)
    }

    /// Add a column that update statements must not touch
    pub fn readonly(self, property: &str, column: &str) -> Self {
        self.push_column(property, column, false, false)
    }

    fn push_column(mut self, property: &str, column: &str, updatable: bool, primary_key: bool) -> Self {
        self.columns.push(ColumnDescriptor {
            property: property.to_string(),
            column: column.to_string(),
            table: self.table.clone(),
            updatable,
            primary_key,
        });
        self
    }

    pub fn find(&self, property: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.property == property)
    }

    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

/// Resolves entity names and properties into table and column descriptors
pub trait MetadataResolver: Send + Sync + Debug {
    fn table(&self, entity: &str) -> Option<Arc<TableDescriptor>>;

    fn column(&self, entity: &str, property: &str) -> Option<ColumnDescriptor> {
        self.table(entity)?.find(property).cloned()
    }

    fn primary_key(&self, entity: &str) -> Option<ColumnDescriptor> {
        self.table(entity)?.primary_key().cloned()
    }
}

/// Types that describe their own table mapping
pub trait Entity {
    const NAME: &'static str;

    fn describe() -> TableDescriptor;
}

/// Concurrent registry of table descriptors keyed by entity name
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    tables: DashMap<String, Arc<TableDescriptor>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a descriptor
    pub fn register(&self, descriptor: TableDescriptor) -> Arc<TableDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.tables
            .insert(descriptor.entity.clone(), Arc::clone(&descriptor));
        descriptor
    }

    pub fn register_entity<E: Entity>(&self) -> Arc<TableDescriptor> {
        self.register(E::describe())
    }

    pub fn with(self, descriptor: TableDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.tables.contains_key(entity)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl MetadataResolver for MetadataRegistry {
    fn table(&self, entity: &str) -> Option<Arc<TableDescriptor>> {
        self.tables.get(entity).map(|entry| Arc::clone(entry.value()))
    }
}
