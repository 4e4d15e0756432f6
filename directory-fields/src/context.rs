//! FieldsContext: main API surface for field definitions.
//!
//! Owns the collaborators every operation goes through: the record store,
//! the settings store, one field store per kind, the type registry and the
//! option parser. Each is injected through [`FieldsContextBuilder`]; the
//! in-memory implementations are used for anything not provided.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{FieldTypes, TypeRegistry};
use crate::entity::PropertyMap;
use crate::error::{DeleteRefusal, FieldsError, Result};
use crate::field::{Field, FieldEnv};
use crate::kind::FieldKind;
use crate::options::{OptionParser, SelectOption, SelectableOptions};
use crate::settings::{as_non_empty_text, meta_key_from_name};
use crate::store::{
    FieldRecord, FieldStore, Lookup, MemoryFieldStore, MemoryRecordStore, MemorySettingsStore,
    NewFieldRecord, RecordStore, SettingsStore,
};

/// What the caller of an operation is allowed to do.
///
/// The surrounding application decides this before calling in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    manage_fields: bool,
}

impl Caller {
    /// A caller allowed to create and delete fields.
    pub fn manager() -> Self {
        Self {
            manage_fields: true,
        }
    }

    /// A caller without field management rights.
    pub fn visitor() -> Self {
        Self {
            manage_fields: false,
        }
    }

    pub fn can_manage_fields(&self) -> bool {
        self.manage_fields
    }
}

/// Arguments of [`FieldsContext::create`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateField {
    pub name: String,
    pub meta: Option<String>,
    pub priority: Option<i64>,
    pub field_type: Option<String>,
    pub linked_profile_field_id: Option<u64>,
}

impl CreateField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    pub fn linked_profile_field(mut self, profile_field_id: u64) -> Self {
        self.linked_profile_field_id = Some(profile_field_id);
        self
    }
}

/// Result of [`FieldsContext::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The field was removed, along with the registration field linked to it when there was one.
    Deleted { cascaded: Option<u64> },
    /// The caller may not manage fields and the delete was not forced.
    Skipped,
}

/// Builder for `FieldsContext`. Created by `FieldsContext::builder()`.
pub struct FieldsContextBuilder {
    types: Option<Box<dyn TypeRegistry>>,
    options: Option<Box<dyn OptionParser>>,
    records: Option<Box<dyn RecordStore>>,
    settings: Option<Box<dyn SettingsStore>>,
    listing: Option<Box<dyn FieldStore>>,
    profile: Option<Box<dyn FieldStore>>,
    registration: Option<Box<dyn FieldStore>>,
}

impl FieldsContextBuilder {
    pub fn types(mut self, types: impl TypeRegistry + 'static) -> Self {
        self.types = Some(Box::new(types));
        self
    }

    pub fn options(mut self, options: impl OptionParser + 'static) -> Self {
        self.options = Some(Box::new(options));
        self
    }

    pub fn records(mut self, records: impl RecordStore + 'static) -> Self {
        self.records = Some(Box::new(records));
        self
    }

    pub fn settings(mut self, settings: impl SettingsStore + 'static) -> Self {
        self.settings = Some(Box::new(settings));
        self
    }

    /// Field store for one kind.
    pub fn store(mut self, kind: FieldKind, store: impl FieldStore + 'static) -> Self {
        let store: Box<dyn FieldStore> = Box::new(store);
        match kind {
            FieldKind::Listing => self.listing = Some(store),
            FieldKind::Profile => self.profile = Some(store),
            FieldKind::Registration => self.registration = Some(store),
        }
        self
    }

    pub fn build(self) -> FieldsContext {
        fn memory_store() -> Box<dyn FieldStore> {
            Box::new(MemoryFieldStore::new())
        }

        FieldsContext {
            types: self.types.unwrap_or_else(|| Box::new(FieldTypes::default())),
            options: self
                .options
                .unwrap_or_else(|| Box::new(SelectableOptions::new())),
            records: self
                .records
                .unwrap_or_else(|| Box::new(MemoryRecordStore::new())),
            settings: self
                .settings
                .unwrap_or_else(|| Box::new(MemorySettingsStore::new())),
            listing: self.listing.unwrap_or_else(memory_store),
            profile: self.profile.unwrap_or_else(memory_store),
            registration: self.registration.unwrap_or_else(memory_store),
        }
    }
}

/// Field definitions of every kind, and the operations on them.
pub struct FieldsContext {
    types: Box<dyn TypeRegistry>,
    options: Box<dyn OptionParser>,
    records: Box<dyn RecordStore>,
    settings: Box<dyn SettingsStore>,
    listing: Box<dyn FieldStore>,
    profile: Box<dyn FieldStore>,
    registration: Box<dyn FieldStore>,
}

impl FieldsContext {
    /// Start configuring a context.
    ///
    /// ```rust,ignore
    /// let ctx = FieldsContext::builder()
    ///     .types(FieldTypes::load()?)
    ///     .settings(YamlSettingsStore::open(path)?)
    ///     .build();
    /// ```
    pub fn builder() -> FieldsContextBuilder {
        FieldsContextBuilder {
            types: None,
            options: None,
            records: None,
            settings: None,
            listing: None,
            profile: None,
            registration: None,
        }
    }

    /// The field store of `kind`.
    pub fn store(&self, kind: FieldKind) -> &dyn FieldStore {
        match kind {
            FieldKind::Listing => self.listing.as_ref(),
            FieldKind::Profile => self.profile.as_ref(),
            FieldKind::Registration => self.registration.as_ref(),
        }
    }

    fn store_mut(&mut self, kind: FieldKind) -> &mut dyn FieldStore {
        match kind {
            FieldKind::Listing => self.listing.as_mut(),
            FieldKind::Profile => self.profile.as_mut(),
            FieldKind::Registration => self.registration.as_mut(),
        }
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn settings_store(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    /// Write one setting of a record, e.g. after an edit in the settings UI.
    ///
    /// Hydrated fields don't see the change until they are reloaded. Writing
    /// the kind's meta key setting also moves the field store's meta key index.
    pub fn write_setting(
        &mut self,
        kind: FieldKind,
        record_id: u64,
        name: &str,
        value: Value,
    ) -> Result<()> {
        let indexed_meta = (name == kind.meta_setting()).then(|| as_non_empty_text(&value));
        self.settings.write(record_id, &kind.setting_key(name), value)?;
        if let Some(meta_key) = indexed_meta {
            self.sync_meta_index(kind, record_id, meta_key)?;
        }
        Ok(())
    }

    fn sync_meta_index(
        &mut self,
        kind: FieldKind,
        record_id: u64,
        meta_key: Option<String>,
    ) -> Result<()> {
        let Some(mut record) = self.store(kind).get_item_by(Lookup::RecordId(record_id)) else {
            return Ok(());
        };
        if record.meta_key != meta_key {
            debug!(
                %kind,
                record_id,
                from = ?record.meta_key,
                to = ?meta_key,
                "meta key index moved"
            );
            record.meta_key = meta_key;
            self.store_mut(kind).update_item(record)?;
        }
        Ok(())
    }

    // --- Lookup ---

    /// The field of `kind` stored under `record_id`, hydrated.
    pub fn get_from_id(&self, kind: FieldKind, record_id: u64) -> Result<Option<Field>> {
        match self.store(kind).get_item_by(Lookup::RecordId(record_id)) {
            Some(record) => self.hydrate(kind, &record).map(Some),
            None => Ok(None),
        }
    }

    /// Every field of `kind`, ordered by priority.
    pub fn all(&self, kind: FieldKind) -> Result<Vec<Field>> {
        let mut fields = self
            .store(kind)
            .all_items()
            .iter()
            .map(|record| self.hydrate(kind, record))
            .collect::<Result<Vec<_>>>()?;
        fields.sort_by_key(Field::priority);
        Ok(fields)
    }

    /// Re-read a field's settings and parse them again.
    ///
    /// Keeps the field store's meta key index in step with the settings.
    pub fn reload(&mut self, field: &mut Field) -> Result<()> {
        let kind = field.kind();
        let record_id = field.record_id();
        if self.store(kind).get_item_by(Lookup::RecordId(record_id)).is_none() {
            return Err(FieldsError::FieldNotFound { kind, record_id });
        }

        let stored_meta = self
            .settings
            .read(record_id)?
            .get(&kind.setting_key(kind.meta_setting()))
            .and_then(as_non_empty_text);
        self.sync_meta_index(kind, record_id, stored_meta)?;

        *field = self
            .get_from_id(kind, record_id)?
            .ok_or(FieldsError::FieldNotFound { kind, record_id })?;
        Ok(())
    }

    fn hydrate(&self, kind: FieldKind, record: &FieldRecord) -> Result<Field> {
        let settings = self.settings.read(record.record_id)?;

        let mut initial = PropertyMap::new();
        initial.insert("entity_id".into(), json!(record.entity_id.to_string()));
        initial.insert("record_id".into(), json!(record.record_id));
        if let Some(meta_key) = &record.meta_key {
            initial.insert("meta_key".into(), json!(meta_key));
        }
        if kind == FieldKind::Registration {
            if let Some(profile_field_id) = record.profile_field_id {
                initial.insert("profile_field_id".into(), json!(profile_field_id));
            }
        }
        initial.insert(
            "settings".into(),
            Value::Object(settings.into_iter().collect()),
        );

        Ok(Field::new(kind, Some(initial), self))
    }

    // --- Create ---

    /// Create a field of `kind` and return it hydrated.
    ///
    /// The meta key defaults to the name turned into a slug. Meta keys are
    /// unique per kind, compared against the meta keys fields resolve to
    /// after parsing; a clash is reported before anything is written. A
    /// registration field also claims the meta key of its profile field.
    pub fn create(&mut self, kind: FieldKind, args: CreateField, caller: &Caller) -> Result<Field> {
        if !caller.can_manage_fields() {
            return Err(FieldsError::Unauthorized { kind });
        }
        if args.name.trim().is_empty() {
            return Err(FieldsError::missing("name"));
        }
        let linked_profile_field_id = match kind {
            FieldKind::Registration => Some(
                args.linked_profile_field_id
                    .filter(|id| *id > 0)
                    .ok_or_else(|| FieldsError::missing("profile_field_id"))?,
            ),
            FieldKind::Listing | FieldKind::Profile => None,
        };

        let meta = args
            .meta
            .filter(|meta| !meta.is_empty())
            .unwrap_or_else(|| meta_key_from_name(&args.name));
        if meta.is_empty() {
            return Err(FieldsError::missing("meta"));
        }
        let mut claimed = vec![meta.clone()];
        if let Some(profile) = linked_profile_field_id.and_then(|id| self.profile_field(id)) {
            claimed.extend(profile.meta_key().map(str::to_string));
        }
        let existing = self.all(kind)?;
        if let Some(meta_key) = claimed
            .into_iter()
            .find(|key| existing.iter().any(|f| f.meta_key() == Some(key.as_str())))
        {
            return Err(FieldsError::DuplicateMetaKey { kind, meta_key });
        }

        let record_id = self.records.insert_record(kind.record_type(), &args.name)?;
        self.store_mut(kind).add_item(NewFieldRecord {
            record_id,
            meta_key: Some(meta.clone()),
            profile_field_id: linked_profile_field_id,
        })?;

        if let Some(priority) = args.priority.filter(|p| *p != 0) {
            self.write_setting(kind, record_id, "priority", json!(priority))?;
        }
        self.write_setting(kind, record_id, kind.meta_setting(), json!(meta))?;
        if let Some(field_type) = args.field_type.filter(|t| !t.is_empty()) {
            self.write_setting(kind, record_id, "type", json!(field_type))?;
        }
        if let Some(profile_field_id) = linked_profile_field_id {
            self.write_setting(kind, record_id, "profile_field_id", json!(profile_field_id))?;
        }

        debug!(%kind, record_id, meta_key = %meta, "field created");

        self.get_from_id(kind, record_id)?
            .ok_or(FieldsError::FieldNotFound { kind, record_id })
    }

    /// Write a new priority for a field and return it re-hydrated.
    ///
    /// Negative priorities are stored as their absolute value.
    pub fn set_priority(
        &mut self,
        kind: FieldKind,
        record_id: u64,
        priority: i64,
        caller: &Caller,
    ) -> Result<Field> {
        if !caller.can_manage_fields() {
            return Err(FieldsError::Unauthorized { kind });
        }
        if self.store(kind).get_item_by(Lookup::RecordId(record_id)).is_none() {
            return Err(FieldsError::FieldNotFound { kind, record_id });
        }
        let priority = i64::try_from(priority.unsigned_abs()).unwrap_or(i64::MAX);
        self.write_setting(kind, record_id, "priority", json!(priority))?;
        self.get_from_id(kind, record_id)?
            .ok_or(FieldsError::FieldNotFound { kind, record_id })
    }

    // --- Delete ---

    /// Delete a field permanently.
    ///
    /// Without management rights the call is a no-op unless `force` is set.
    /// Default fields are refused unless `force` is set. Deleting a profile
    /// field also deletes the deletable registration field linked to it.
    pub fn delete(
        &mut self,
        kind: FieldKind,
        record_id: u64,
        caller: &Caller,
        force: bool,
    ) -> Result<DeleteOutcome> {
        if !force && !caller.can_manage_fields() {
            debug!(%kind, record_id, "delete skipped, caller may not manage fields");
            return Ok(DeleteOutcome::Skipped);
        }

        let field = self
            .get_from_id(kind, record_id)?
            .filter(|field| field.record_id() > 0)
            .ok_or(FieldsError::CannotDelete {
                kind,
                record_id,
                reason: DeleteRefusal::NotFound,
            })?;
        if !field.is_deletable() && !force {
            return Err(FieldsError::CannotDelete {
                kind,
                record_id,
                reason: DeleteRefusal::DefaultField,
            });
        }

        self.remove(&field)?;
        debug!(%kind, record_id, forced = force, "field deleted");

        let cascaded = match kind {
            FieldKind::Profile => self.delete_linked_registration_field(record_id)?,
            FieldKind::Listing | FieldKind::Registration => None,
        };
        Ok(DeleteOutcome::Deleted { cascaded })
    }

    /// One level only: the registration field's own removal never cascades.
    fn delete_linked_registration_field(&mut self, profile_field_id: u64) -> Result<Option<u64>> {
        let Some(record) = self
            .registration
            .get_item_by(Lookup::ProfileFieldId(profile_field_id))
        else {
            return Ok(None);
        };
        let linked = self.hydrate(FieldKind::Registration, &record)?;
        if !linked.is_deletable() {
            debug!(
                profile_field_id,
                record_id = linked.record_id(),
                "linked registration field is a default field, keeping it"
            );
            return Ok(None);
        }

        self.remove(&linked)?;
        debug!(
            profile_field_id,
            record_id = linked.record_id(),
            "linked registration field deleted"
        );
        Ok(Some(linked.record_id()))
    }

    fn remove(&mut self, field: &Field) -> Result<()> {
        if let Some(entity_id) = field.entity_id() {
            self.store_mut(field.kind()).delete_item(&entity_id)?;
        }
        self.settings.clear(field.record_id())?;
        self.records.delete_record(field.record_id())
    }
}

impl FieldEnv for FieldsContext {
    fn types(&self) -> &dyn TypeRegistry {
        self.types.as_ref()
    }

    fn parse_options(&self, raw: &Value) -> Vec<SelectOption> {
        self.options.parse_selectable_options(raw)
    }

    fn title_of(&self, record_id: u64) -> Option<String> {
        self.records.title_of(record_id)
    }

    fn profile_field(&self, record_id: u64) -> Option<Field> {
        match self.get_from_id(FieldKind::Profile, record_id) {
            Ok(field) => field,
            Err(e) => {
                warn!(record_id, %e, "could not load linked profile field");
                None
            }
        }
    }
}
