//! Field kinds and the data each kind carries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The context a field is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Listing,
    Profile,
    Registration,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [
        FieldKind::Listing,
        FieldKind::Profile,
        FieldKind::Registration,
    ];

    /// Namespace of this kind's setting keys. Stored keys carry a leading `_`.
    pub fn settings_prefix(self) -> &'static str {
        match self {
            FieldKind::Listing => "listing_field_",
            FieldKind::Profile => "profile_field_",
            FieldKind::Registration => "registration_field_",
        }
    }

    /// The record collection this kind's fields are stored in.
    pub fn record_type(self) -> &'static str {
        match self {
            FieldKind::Listing => "pno_listings_fields",
            FieldKind::Profile => "pno_users_fields",
            FieldKind::Registration => "pno_signup_fields",
        }
    }

    /// The bare setting name holding the meta key.
    ///
    /// Registration fields keep theirs under a default marker.
    pub fn meta_setting(self) -> &'static str {
        match self {
            FieldKind::Registration => "is_default",
            FieldKind::Listing | FieldKind::Profile => "meta_key",
        }
    }

    /// Full stored key for a bare setting name, e.g. `_listing_field_type`.
    pub fn setting_key(self, name: &str) -> String {
        format!("_{}{}", self.settings_prefix(), name)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Listing => "listing",
            FieldKind::Profile => "profile",
            FieldKind::Registration => "registration",
        };
        f.write_str(name)
    }
}

/// Kind-specific attributes of a field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum KindData {
    Listing {
        /// Set when the field selects terms of a taxonomy.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        taxonomy_id: Option<String>,
        #[serde(default)]
        branch_nodes_disabled: bool,
    },
    Profile {
        /// The user whose value was last loaded.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<u64>,
    },
    Registration {
        /// Profile field whose schema this field mirrors.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        linked_profile_field_id: Option<u64>,
    },
}

impl KindData {
    pub fn new(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Listing => KindData::Listing {
                taxonomy_id: None,
                branch_nodes_disabled: false,
            },
            FieldKind::Profile => KindData::Profile { user_id: None },
            FieldKind::Registration => KindData::Registration {
                linked_profile_field_id: None,
            },
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            KindData::Listing { .. } => FieldKind::Listing,
            KindData::Profile { .. } => FieldKind::Profile,
            KindData::Registration { .. } => FieldKind::Registration,
        }
    }
}
