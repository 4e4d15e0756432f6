//! User profile fields and their per-user values.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::{FieldsError, Result};
use crate::field::{Field, FieldEnv};
use crate::kind::{FieldKind, KindData};
use crate::settings::maybe_unserialize;

pub(crate) fn dispatch(field: &mut Field, name: &str, value: &Value, env: &dyn FieldEnv) -> bool {
    field.dispatch_common(name, value, env)
}

/// Where end-user values of profile fields are stored.
pub trait ValueSource {
    /// The value stored for `user_id` under `meta_key`.
    fn user_value(&self, user_id: u64, meta_key: &str) -> Option<Value>;
}

/// In-memory [`ValueSource`].
#[derive(Debug, Default)]
pub struct MemoryValueSource {
    values: HashMap<(u64, String), Value>,
}

impl MemoryValueSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, user_id: u64, meta_key: impl Into<String>, value: Value) -> Self {
        self.set(user_id, meta_key, value);
        self
    }

    pub fn set(&mut self, user_id: u64, meta_key: impl Into<String>, value: Value) {
        self.values.insert((user_id, meta_key.into()), value);
    }
}

impl ValueSource for MemoryValueSource {
    fn user_value(&self, user_id: u64, meta_key: &str) -> Option<Value> {
        self.values.get(&(user_id, meta_key.to_string())).cloned()
    }
}

impl Field {
    /// Resolve this profile field's value for `user_id`.
    ///
    /// Multiple-value fields decode serialized arrays. A user with no
    /// stored value leaves `value` unset.
    pub fn load_value(&mut self, user_id: u64, source: &dyn ValueSource) -> Result<()> {
        let kind = self.kind();
        if kind != FieldKind::Profile {
            return Err(FieldsError::InvalidArgument {
                property: format!("user_id on a {kind} field"),
            });
        }
        let meta_key = self
            .meta_key
            .clone()
            .ok_or_else(|| FieldsError::missing("meta_key"))?;

        self.kind = KindData::Profile {
            user_id: Some(user_id),
        };
        self.value = source.user_value(user_id, &meta_key).map(|value| {
            if self.multiple {
                maybe_unserialize(&value)
            } else {
                value
            }
        });

        debug!(
            kind = %FieldKind::Profile,
            user_id,
            meta_key = %meta_key,
            found = self.value.is_some(),
            "profile field value loaded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::tests::{parsed, TestEnv};
    use serde_json::json;

    const KIND: FieldKind = FieldKind::Profile;

    #[test]
    fn shared_table_applies() {
        let field = parsed(
            KIND,
            &[
                ("meta_key", json!("company")),
                ("is_required", json!("yes")),
                ("is_read_only", json!(true)),
                ("is_admin_only", json!("1")),
                ("selectable_options", json!(["Small", "Large"])),
            ],
            &TestEnv::default(),
        );
        assert_eq!(field.meta_key(), Some("company"));
        assert!(field.is_required());
        assert!(field.is_read_only());
        assert!(field.is_admin_only());
        assert_eq!(field.options()[0].value, "small");
    }

    #[test]
    fn listing_only_settings_pass_through() {
        let field = parsed(
            KIND,
            &[("taxonomy", json!("listings-types")), ("chain_is_multiple", json!(true))],
            &TestEnv::default(),
        );
        assert_eq!(field.taxonomy_id(), None);
        assert_eq!(field.property("taxonomy"), Some(&json!("listings-types")));
        assert!(!field.is_multiple());
    }

    #[test]
    fn load_value_for_user() {
        let mut field = parsed(KIND, &[("meta_key", json!("company"))], &TestEnv::default());
        let source = MemoryValueSource::new().with_value(7, "company", json!("Acme"));

        field.load_value(7, &source).unwrap();
        assert_eq!(field.user_id(), Some(7));
        assert_eq!(field.value(), Some(&json!("Acme")));

        field.load_value(8, &source).unwrap();
        assert_eq!(field.user_id(), Some(8));
        assert_eq!(field.value(), None);
    }

    #[test]
    fn load_value_decodes_multiple_values() {
        let mut field = parsed(
            KIND,
            &[("meta_key", json!("skills")), ("type", json!("multicheckbox"))],
            &TestEnv::default(),
        );
        let source = MemoryValueSource::new().with_value(1, "skills", json!("[\"rust\",\"go\"]"));

        field.load_value(1, &source).unwrap();
        assert_eq!(field.value(), Some(&json!(["rust", "go"])));
    }

    #[test]
    fn load_value_requires_meta_key() {
        let mut field = parsed(KIND, &[], &TestEnv::default());
        let err = field.load_value(1, &MemoryValueSource::new()).unwrap_err();
        assert!(matches!(err, FieldsError::InvalidArgument { .. }));
        assert_eq!(field.user_id(), None);
        assert_eq!(field.value(), None);
    }

    #[test]
    fn load_value_rejects_other_kinds() {
        let mut field = parsed(
            FieldKind::Listing,
            &[("meta_key", json!("company"))],
            &TestEnv::default(),
        );
        assert!(field.load_value(1, &MemoryValueSource::new()).is_err());
    }
}
