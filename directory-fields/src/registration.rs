//! Account registration fields.
//!
//! Registration fields keep their meta key under the `is_default` marker.
//! Built-in ones (username, email, password) get a fixed input type. Custom
//! ones are linked to a profile field and mirror its schema: type, label of
//! the type, meta key and options always come from the linked profile field
//! when it exists, whatever the registration field's own settings say.

use serde_json::Value;
use tracing::{debug, trace};

use crate::field::{Field, FieldEnv};
use crate::settings::{as_non_empty_text, is_truthy};

pub(crate) fn dispatch(field: &mut Field, name: &str, value: &Value) -> bool {
    match name {
        "is_required" => field.required = is_truthy(value),
        "is_default" => field.meta_key = as_non_empty_text(value),
        _ => return false,
    }
    true
}

pub(crate) fn finish(field: &mut Field, env: &dyn FieldEnv) {
    if !field.deletable {
        apply_builtin_type(field, env);
    }
    if let Some(profile_field_id) = field.linked_profile_field_id() {
        mirror_profile_field(field, profile_field_id, env);
    }
}

/// Built-in fields are password, email or plain text inputs; email is always required.
fn apply_builtin_type(field: &mut Field, env: &dyn FieldEnv) {
    let field_type = match field.meta_key.as_deref() {
        Some("password") => "password",
        Some("email") => "email",
        _ => "text",
    };
    field.field_type = Some(field_type.to_string());
    field.resolve_type_label(env.types());
    require_builtin_email(field);
}

fn require_builtin_email(field: &mut Field) {
    if field.meta_key.as_deref() == Some("email") {
        field.required = true;
    }
}

fn mirror_profile_field(field: &mut Field, profile_field_id: u64, env: &dyn FieldEnv) {
    let Some(profile) = env.profile_field(profile_field_id) else {
        trace!(profile_field_id, "linked profile field not found");
        return;
    };

    let types = env.types();
    field.field_type = profile.field_type;
    field.type_label = profile.type_label;
    field.meta_key = profile.meta_key;
    if field.is_multi_option_type(types) {
        field.multiple = true;
    }
    if !profile.options.is_empty() {
        field.options = profile.options;
    }
    field.derive_deletable(types);
    // A mirrored default key makes this a built-in field; its type stays the profile's.
    if !field.deletable {
        require_builtin_email(field);
    }

    debug!(
        record_id = field.record_id,
        profile_field_id,
        meta_key = ?field.meta_key,
        "registration field mirrors profile field"
    );
}
