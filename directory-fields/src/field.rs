//! The field entity and the shared settings-parsing algorithm.
//!
//! A [`Field`] is built from a settings blob whose keys look like
//! `_<prefix><name>`. Parsing visits the keys in stored order, strips the
//! kind's prefix and dispatches on the bare name through the kind's table
//! ([`crate::listing`], [`crate::profile`], [`crate::registration`]). Names no
//! table recognises land on the same-named attribute, or in the field's
//! property bag when there is no such attribute.
//!
//! Derived attributes are computed after the dispatch pass, in this order:
//! type label, forced `multiple`, `deletable`, then the kind's own rules.

use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};
use ulid::Ulid;

use crate::config::TypeRegistry;
use crate::entity::{Entity, PropertyMap};
use crate::kind::{FieldKind, KindData};
use crate::options::SelectOption;
use crate::settings::{
    as_byte_size, as_i64, as_non_empty_text, as_string_list, as_text, as_u64, is_truthy,
    maybe_unserialize, remove_setting_prefix, Settings,
};
use crate::{listing, profile, registration};

/// What parsing needs from its surroundings.
pub trait FieldEnv {
    fn types(&self) -> &dyn TypeRegistry;

    fn parse_options(&self, raw: &Value) -> Vec<SelectOption>;

    fn title_of(&self, record_id: u64) -> Option<String>;

    /// The hydrated profile field stored under `record_id`, if any.
    fn profile_field(&self, record_id: u64) -> Option<Field>;
}

/// A configurable form-field definition.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Field {
    pub(crate) entity_id: Option<Ulid>,
    pub(crate) record_id: u64,
    pub(crate) meta_key: Option<String>,
    pub(crate) priority: i64,
    pub(crate) deletable: bool,
    #[serde(rename = "type")]
    pub(crate) field_type: Option<String>,
    pub(crate) type_label: Option<String>,
    pub(crate) settings: Option<Settings>,
    pub(crate) title: Option<String>,
    pub(crate) label: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) placeholder: Option<String>,
    pub(crate) required: bool,
    pub(crate) read_only: bool,
    pub(crate) admin_only: bool,
    pub(crate) options: Vec<SelectOption>,
    pub(crate) allowed_file_types: Option<Vec<String>>,
    pub(crate) multiple: bool,
    pub(crate) max_size: Option<u64>,
    pub(crate) value: Option<Value>,
    #[serde(flatten)]
    pub(crate) kind: KindData,
    #[serde(skip)]
    pub(crate) props: Entity,
}

impl Field {
    /// Build a field of `kind`.
    ///
    /// Entries of `initial` are assigned first: `entity_id`, `record_id`,
    /// `meta_key`, `settings` and every named attribute go to their typed
    /// slot, anything else to the property bag. The title is then resolved
    /// from the record and the settings are parsed.
    pub fn new(kind: FieldKind, initial: Option<PropertyMap>, env: &dyn FieldEnv) -> Self {
        let mut field = Self::empty(kind);
        if let Some(initial) = initial {
            field.assign(initial);
        }
        if field.record_id > 0 {
            field.title = env.title_of(field.record_id);
        }
        let settings = field.settings.take();
        field.parse_settings(settings, env);
        field
    }

    fn empty(kind: FieldKind) -> Self {
        Self {
            entity_id: None,
            record_id: 0,
            meta_key: None,
            priority: 0,
            deletable: true,
            field_type: None,
            type_label: None,
            settings: None,
            title: None,
            label: None,
            description: None,
            placeholder: None,
            required: false,
            read_only: false,
            admin_only: false,
            options: Vec::new(),
            allowed_file_types: None,
            multiple: false,
            max_size: None,
            value: None,
            kind: KindData::new(kind),
            props: Entity::default(),
        }
    }

    fn assign(&mut self, initial: PropertyMap) {
        for (name, value) in initial {
            match name.as_str() {
                "entity_id" => {
                    self.entity_id = as_text(&value).and_then(|id| Ulid::from_string(&id).ok());
                }
                "record_id" => self.record_id = as_u64(&value).unwrap_or(0),
                "meta_key" => self.meta_key = as_non_empty_text(&value),
                "settings" => {
                    self.settings = match maybe_unserialize(&value) {
                        Value::Object(map) => Some(map.into_iter().collect()),
                        _ => None,
                    };
                }
                _ => self.assign_attribute(&name, value),
            }
        }
    }

    /// Parse a settings blob into typed attributes.
    ///
    /// Never fails: unknown settings pass through, malformed ones are ignored.
    pub fn parse_settings(&mut self, settings: Option<Settings>, env: &dyn FieldEnv) {
        let kind = self.kind();

        if let Some(settings) = settings.filter(|s| !s.is_empty()) {
            let prefix = format!("_{}", kind.settings_prefix());
            for (key, value) in &settings {
                let name = remove_setting_prefix(&prefix, key);
                let handled = match kind {
                    FieldKind::Listing => listing::dispatch(self, name, value, env),
                    FieldKind::Profile => profile::dispatch(self, name, value, env),
                    FieldKind::Registration => registration::dispatch(self, name, value),
                };
                if !handled {
                    self.assign_attribute(name, value.clone());
                }
            }
            self.settings = Some(settings);
        }

        let types = env.types();
        self.resolve_type_label(types);
        if self.is_multi_option_type(types) {
            self.multiple = true;
        }
        self.derive_deletable(types);

        match kind {
            FieldKind::Listing => listing::finish(self),
            FieldKind::Profile => {}
            FieldKind::Registration => registration::finish(self, env),
        }

        trace!(
            %kind,
            record_id = self.record_id,
            meta_key = ?self.meta_key,
            field_type = ?self.field_type,
            "field settings parsed"
        );
    }

    /// Entries listing and profile fields share. Returns false for names it doesn't own.
    pub(crate) fn dispatch_common(&mut self, name: &str, value: &Value, env: &dyn FieldEnv) -> bool {
        match name {
            "is_required" => self.required = is_truthy(value),
            "meta_key" => self.meta_key = as_non_empty_text(value),
            "is_read_only" => self.read_only = is_truthy(value),
            "is_admin_only" => self.admin_only = is_truthy(value),
            "selectable_options" => self.options = env.parse_options(value),
            "file_max_size" => {
                self.max_size = as_byte_size(value);
                if self.max_size.is_none() && is_truthy(value) {
                    warn!(%value, "ignoring unreadable file size limit");
                }
            }
            "file_extensions" => self.allowed_file_types = as_string_list(value),
            "file_is_multiple" => self.multiple = self.has_type("file"),
            _ => return false,
        }
        true
    }

    /// Assign a setting to the attribute of the same name, or keep it as a property.
    pub(crate) fn assign_attribute(&mut self, name: &str, value: Value) {
        match name {
            "type" => self.field_type = as_non_empty_text(&value),
            "priority" => match as_i64(&value) {
                Some(priority) => self.priority = priority,
                None => warn!(%name, %value, "ignoring non-numeric priority"),
            },
            "label" => self.label = as_text(&value),
            "description" => self.description = as_text(&value),
            "placeholder" => self.placeholder = as_text(&value),
            "title" => self.title = as_text(&value),
            _ => {
                let handled = match &mut self.kind {
                    KindData::Listing {
                        branch_nodes_disabled,
                        ..
                    } if name == "disable_branch_nodes" => {
                        *branch_nodes_disabled = is_truthy(&value);
                        true
                    }
                    KindData::Registration {
                        linked_profile_field_id,
                    } if name == "profile_field_id" => {
                        *linked_profile_field_id = as_u64(&value).filter(|id| *id > 0);
                        true
                    }
                    _ => false,
                };
                if !handled {
                    self.props.set(name, value);
                }
            }
        }
    }

    pub(crate) fn resolve_type_label(&mut self, types: &dyn TypeRegistry) {
        self.type_label = self
            .field_type
            .as_deref()
            .and_then(|t| types.type_label(t))
            .map(str::to_string);
    }

    pub(crate) fn is_multi_option_type(&self, types: &dyn TypeRegistry) -> bool {
        self.field_type
            .as_deref()
            .is_some_and(|t| types.is_multi_option(t))
    }

    /// `deletable` is false exactly when the meta key is a default key of this kind.
    pub(crate) fn derive_deletable(&mut self, types: &dyn TypeRegistry) {
        let kind = self.kind();
        self.deletable = !self
            .meta_key
            .as_deref()
            .is_some_and(|key| types.is_default_field(kind, key));
    }

    pub(crate) fn has_type(&self, field_type: &str) -> bool {
        self.field_type.as_deref() == Some(field_type)
    }

    /// Raw value of the stored setting `_<prefix><name>`, or `false` when unset.
    pub fn get_setting(&self, name: &str) -> Value {
        let key = self.kind().setting_key(name);
        self.settings
            .as_ref()
            .and_then(|settings| settings.get(&key))
            .cloned()
            .unwrap_or(Value::Bool(false))
    }

    /// Plain map of every attribute plus pass-through properties.
    pub fn to_map(&self) -> PropertyMap {
        let mut map = self.props.to_map();
        if let Ok(Value::Object(attributes)) = serde_json::to_value(self) {
            map.extend(attributes);
        }
        map
    }

    pub fn kind(&self) -> FieldKind {
        self.kind.kind()
    }

    pub fn kind_data(&self) -> &KindData {
        &self.kind
    }

    pub fn entity_id(&self) -> Option<Ulid> {
        self.entity_id
    }

    pub fn record_id(&self) -> u64 {
        self.record_id
    }

    pub fn meta_key(&self) -> Option<&str> {
        self.meta_key.as_deref()
    }

    pub fn settings_prefix(&self) -> &'static str {
        self.kind().settings_prefix()
    }

    pub fn record_type(&self) -> &'static str {
        self.kind().record_type()
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// False for built-in default fields.
    pub fn is_deletable(&self) -> bool {
        self.deletable
    }

    pub fn field_type(&self) -> Option<&str> {
        self.field_type.as_deref()
    }

    /// Human readable name of the type; `None` when the type isn't registered.
    pub fn type_label(&self) -> Option<&str> {
        self.type_label.as_deref()
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_admin_only(&self) -> bool {
        self.admin_only
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn allowed_file_types(&self) -> Option<&[String]> {
        self.allowed_file_types.as_deref()
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Upload size limit in bytes.
    pub fn max_size(&self) -> Option<u64> {
        self.max_size
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// A setting that no attribute claimed.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    pub fn taxonomy_id(&self) -> Option<&str> {
        match &self.kind {
            KindData::Listing { taxonomy_id, .. } => taxonomy_id.as_deref(),
            _ => None,
        }
    }

    pub fn is_branch_nodes_disabled(&self) -> bool {
        matches!(
            self.kind,
            KindData::Listing {
                branch_nodes_disabled: true,
                ..
            }
        )
    }

    pub fn linked_profile_field_id(&self) -> Option<u64> {
        match self.kind {
            KindData::Registration {
                linked_profile_field_id,
            } => linked_profile_field_id,
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<u64> {
        match self.kind {
            KindData::Profile { user_id } => user_id,
            _ => None,
        }
    }
}
