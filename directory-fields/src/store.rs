//! Collaborator contracts for persistence, with in-memory implementations.
//!
//! A field lives in three places: a titled record (the record store), a row
//! in its kind's field store that indexes it by meta key and profile link,
//! and a settings blob keyed by record id (the settings store).

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;
use ulid::Ulid;

use crate::error::{FieldsError, Result};
use crate::settings::Settings;

/// A stored field row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldRecord {
    pub entity_id: Ulid,
    pub record_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_field_id: Option<u64>,
}

/// Attributes of a row about to be added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewFieldRecord {
    pub record_id: u64,
    pub meta_key: Option<String>,
    pub profile_field_id: Option<u64>,
}

/// Indexed attribute to look a row up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    RecordId(u64),
    MetaKey(&'a str),
    ProfileFieldId(u64),
}

impl Lookup<'_> {
    pub fn matches(&self, record: &FieldRecord) -> bool {
        match *self {
            Lookup::RecordId(id) => record.record_id == id,
            Lookup::MetaKey(key) => record.meta_key.as_deref() == Some(key),
            Lookup::ProfileFieldId(id) => record.profile_field_id == Some(id),
        }
    }
}

/// Rows of one field kind.
pub trait FieldStore {
    fn add_item(&mut self, item: NewFieldRecord) -> Result<Ulid>;

    /// First row matching `lookup`.
    fn get_item_by(&self, lookup: Lookup<'_>) -> Option<FieldRecord>;

    /// Replace the indexed attributes of an existing row.
    fn update_item(&mut self, item: FieldRecord) -> Result<()>;

    fn delete_item(&mut self, entity_id: &Ulid) -> Result<()>;

    fn all_items(&self) -> Vec<FieldRecord>;
}

/// Resolves the title of a stored record.
pub trait TitleResolver {
    fn title_of(&self, record_id: u64) -> Option<String>;
}

/// Titled records underlying every field.
pub trait RecordStore: TitleResolver {
    fn insert_record(&mut self, record_type: &str, title: &str) -> Result<u64>;

    /// Remove a record permanently.
    fn delete_record(&mut self, record_id: u64) -> Result<()>;

    fn record_count(&self) -> usize;
}

/// Setting key → value storage per record.
pub trait SettingsStore {
    /// All settings of a record; empty when none were written.
    fn read(&self, record_id: u64) -> Result<Settings>;

    fn write(&mut self, record_id: u64, key: &str, value: Value) -> Result<()>;

    /// Drop every setting of a record.
    fn clear(&mut self, record_id: u64) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryFieldStore {
    items: Vec<FieldRecord>,
}

impl MemoryFieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FieldStore for MemoryFieldStore {
    fn add_item(&mut self, item: NewFieldRecord) -> Result<Ulid> {
        let entity_id = Ulid::new();
        self.items.push(FieldRecord {
            entity_id,
            record_id: item.record_id,
            meta_key: item.meta_key,
            profile_field_id: item.profile_field_id,
        });
        trace!(%entity_id, "field row added");
        Ok(entity_id)
    }

    fn get_item_by(&self, lookup: Lookup<'_>) -> Option<FieldRecord> {
        self.items.iter().find(|r| lookup.matches(r)).cloned()
    }

    fn update_item(&mut self, item: FieldRecord) -> Result<()> {
        let existing = self
            .items
            .iter_mut()
            .find(|r| r.entity_id == item.entity_id)
            .ok_or_else(|| FieldsError::Store {
                message: format!("no field row {}", item.entity_id),
            })?;
        *existing = item;
        Ok(())
    }

    fn delete_item(&mut self, entity_id: &Ulid) -> Result<()> {
        self.items.retain(|r| &r.entity_id != entity_id);
        Ok(())
    }

    fn all_items(&self) -> Vec<FieldRecord> {
        self.items.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Record {
    record_type: String,
    title: String,
}

#[derive(Debug)]
pub struct MemoryRecordStore {
    records: IndexMap<u64, Record>,
    next_id: u64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: IndexMap::new(),
            next_id: 1,
        }
    }

    pub fn record_type_of(&self, record_id: u64) -> Option<&str> {
        self.records
            .get(&record_id)
            .map(|r| r.record_type.as_str())
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleResolver for MemoryRecordStore {
    fn title_of(&self, record_id: u64) -> Option<String> {
        self.records.get(&record_id).map(|r| r.title.clone())
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert_record(&mut self, record_type: &str, title: &str) -> Result<u64> {
        let id = self.next_id;
        self.next_id += 1;
        self.records.insert(
            id,
            Record {
                record_type: record_type.to_string(),
                title: title.to_string(),
            },
        );
        Ok(id)
    }

    fn delete_record(&mut self, record_id: u64) -> Result<()> {
        self.records.shift_remove(&record_id);
        Ok(())
    }

    fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: HashMap<u64, Settings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn read(&self, record_id: u64) -> Result<Settings> {
        Ok(self.settings.get(&record_id).cloned().unwrap_or_default())
    }

    fn write(&mut self, record_id: u64, key: &str, value: Value) -> Result<()> {
        self.settings
            .entry(record_id)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&mut self, record_id: u64) -> Result<()> {
        self.settings.remove(&record_id);
        Ok(())
    }
}
