//! Listing submission fields.
//!
//! On top of the shared table, listing fields can select the terms of a
//! taxonomy (`taxonomy`), store several chained terms (`chain_is_multiple`)
//! and fall back to their record title when no label is set.

use serde_json::Value;

use crate::field::{Field, FieldEnv};
use crate::kind::KindData;
use crate::settings::as_non_empty_text;

pub(crate) fn dispatch(field: &mut Field, name: &str, value: &Value, env: &dyn FieldEnv) -> bool {
    match name {
        "taxonomy" => {
            let taxonomy = as_non_empty_text(value);
            field.options = match &taxonomy {
                Some(taxonomy) => env.parse_options(&Value::String(taxonomy.clone())),
                None => Vec::new(),
            };
            if let KindData::Listing { taxonomy_id, .. } = &mut field.kind {
                *taxonomy_id = taxonomy;
            }
            true
        }
        "chain_is_multiple" => {
            field.multiple = field.has_type("term-chain-dropdown");
            true
        }
        _ => field.dispatch_common(name, value, env),
    }
}

pub(crate) fn finish(field: &mut Field) {
    if field.label.as_deref().is_none_or(str::is_empty) {
        field.label = field.title.clone();
    }
}
