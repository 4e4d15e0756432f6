//! Form-field definitions for directory applications
//!
//! `directory-fields` models the configurable fields of three forms: listing
//! submission, user profile and account registration. Each field is a stored
//! record plus a settings blob; parsing the blob yields a typed [`Field`].
//!
//! # Architecture
//!
//! - **One algorithm, three tables**: `Field::parse_settings` is shared, each kind contributes its own dispatch table
//! - **Injected collaborators**: stores, type registry and option parser are traits handed to [`FieldsContext`]
//! - **Default-field protection**: fields whose meta key is a built-in default can only be deleted with `force`
//! - **Linked registration fields**: a registration field mirrors the schema of the profile field it points at
//! - **Caller capability**: `create` and `delete` take a [`Caller`] instead of checking permissions themselves

pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod field;
pub mod kind;
pub mod listing;
pub mod options;
pub mod profile;
pub mod registration;
pub mod settings;
pub mod store;
pub mod yaml_store;

pub use config::{DefaultFields, FieldTypes, TypeRegistry};
pub use context::{Caller, CreateField, DeleteOutcome, FieldsContext, FieldsContextBuilder};
pub use entity::{Entity, PropertyMap};
pub use error::{DeleteRefusal, FieldsError, Result};
pub use field::{Field, FieldEnv};
pub use kind::{FieldKind, KindData};
pub use options::{OptionParser, SelectOption, SelectableOptions};
pub use profile::{MemoryValueSource, ValueSource};
pub use settings::Settings;
pub use store::{
    FieldRecord, FieldStore, Lookup, MemoryFieldStore, MemoryRecordStore, MemorySettingsStore,
    NewFieldRecord, RecordStore, SettingsStore, TitleResolver,
};
pub use yaml_store::YamlSettingsStore;
