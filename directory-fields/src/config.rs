//! Field type registry configuration using Figment
//!
//! The registry answers three questions during settings parsing: the human
//! readable label of a type, whether a type natively stores several values,
//! and which meta keys belong to built-in fields of each kind.
//!
//! Sources are merged in precedence order (later sources override earlier ones):
//! 1. Built-in defaults
//! 2. An optional YAML, TOML or JSON file, picked by extension
//! 3. Environment variables prefixed `DIRECTORY_FIELDS_`, nested with `__`
//!
//! ```yaml
//! types:
//!   rating: Star rating
//! multi_option_types: [multiselect, multicheckbox, rating]
//! defaults:
//!   registration: [username, email, password]
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::Result;
use crate::kind::FieldKind;

/// Environment variable prefix for registry overrides.
pub const ENV_PREFIX: &str = "DIRECTORY_FIELDS_";

/// Lookups settings parsing needs from the surrounding application.
pub trait TypeRegistry {
    /// Registered type → label table.
    fn registered_types(&self) -> &IndexMap<String, String>;

    /// Types that natively store several values.
    fn multi_option_types(&self) -> &[String];

    /// Meta keys of the built-in fields of `kind`.
    fn default_field_keys(&self, kind: FieldKind) -> &[String];

    fn type_label(&self, field_type: &str) -> Option<&str> {
        self.registered_types().get(field_type).map(String::as_str)
    }

    fn is_multi_option(&self, field_type: &str) -> bool {
        self.multi_option_types().iter().any(|t| t == field_type)
    }

    fn is_default_field(&self, kind: FieldKind, meta_key: &str) -> bool {
        self.default_field_keys(kind).iter().any(|k| k == meta_key)
    }
}

/// Built-in meta keys per field kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DefaultFields {
    pub listing: Vec<String>,
    pub profile: Vec<String>,
    pub registration: Vec<String>,
}

impl DefaultFields {
    pub fn for_kind(&self, kind: FieldKind) -> &[String] {
        match kind {
            FieldKind::Listing => &self.listing,
            FieldKind::Profile => &self.profile,
            FieldKind::Registration => &self.registration,
        }
    }
}

impl Default for DefaultFields {
    fn default() -> Self {
        Self {
            listing: strings(&[
                "listing_title",
                "listing_description",
                "listing_email_address",
                "listing_phone_number",
                "listing_website",
                "listing_video",
                "listing_social_media_profiles",
                "listing_categories",
                "listing_tags",
                "listing_regions",
                "listing_opening_hours",
                "listing_featured_image",
                "listing_gallery",
                "listing_location",
            ]),
            profile: strings(&[
                "avatar",
                "first_name",
                "last_name",
                "email",
                "website",
                "description",
            ]),
            registration: strings(&["username", "email", "password"]),
        }
    }
}

/// The field type registry, loadable from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldTypes {
    pub types: IndexMap<String, String>,
    pub multi_option_types: Vec<String>,
    pub defaults: DefaultFields,
}

impl Default for FieldTypes {
    fn default() -> Self {
        let types = [
            ("text", "Single text line"),
            ("textarea", "Textarea"),
            ("editor", "Rich text editor"),
            ("email", "Email address"),
            ("password", "Password"),
            ("url", "Website"),
            ("select", "Dropdown"),
            ("multiselect", "Multiple select"),
            ("radio", "Radio"),
            ("checkbox", "Checkbox"),
            ("multicheckbox", "Multiple checkboxes"),
            ("number", "Number"),
            ("file", "File"),
            ("term-select", "Taxonomy dropdown"),
            ("term-multiselect", "Taxonomy multiselect"),
            ("term-checklist", "Taxonomy check list"),
            ("term-chain-dropdown", "Taxonomy chain dropdown"),
            ("listing-category", "Listing category selector"),
            ("listing-tags", "Listing tags selector"),
            ("listing-location", "Map"),
            ("listing-opening-hours", "Opening hours"),
            ("social-profiles", "Social profiles selector"),
            ("pricing", "Pricing"),
        ]
        .into_iter()
        .map(|(t, label)| (t.to_string(), label.to_string()))
        .collect();

        Self {
            types,
            multi_option_types: strings(&[
                "multiselect",
                "multicheckbox",
                "term-multiselect",
                "term-checklist",
            ]),
            defaults: DefaultFields::default(),
        }
    }
}

impl FieldTypes {
    /// Defaults overridden by environment variables.
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment(None))
    }

    /// Defaults overridden by `path`, then by environment variables.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::extract(Self::figment(Some(path)))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let types: FieldTypes = figment.extract()?;
        debug!(
            types = types.types.len(),
            multi_option = types.multi_option_types.len(),
            "field type registry loaded"
        );
        Ok(types)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(FieldTypes::default()));

        if let Some(path) = path {
            trace!("Loading field type config: {}", path.display());
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Yaml::file(path)),
            };
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

impl TypeRegistry for FieldTypes {
    fn registered_types(&self) -> &IndexMap<String, String> {
        &self.types
    }

    fn multi_option_types(&self) -> &[String] {
        &self.multi_option_types
    }

    fn default_field_keys(&self, kind: FieldKind) -> &[String] {
        self.defaults.for_kind(kind)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
