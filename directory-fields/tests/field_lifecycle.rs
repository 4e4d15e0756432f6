//! Create, lookup, delete and cascade through `FieldsContext`.

use directory_fields::{
    Caller, CreateField, DeleteOutcome, DeleteRefusal, FieldKind, FieldsContext, FieldsError,
    Lookup, SelectOption, YamlSettingsStore,
};
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

fn context() -> FieldsContext {
    FieldsContext::builder().build()
}

/// A profile field plus a registration field linked to it.
fn linked_pair(ctx: &mut FieldsContext, name: &str, meta: &str) -> (u64, u64) {
    let manager = Caller::manager();
    let profile = ctx
        .create(
            FieldKind::Profile,
            CreateField::new(name).meta(meta).field_type("text"),
            &manager,
        )
        .unwrap();
    let registration = ctx
        .create(
            FieldKind::Registration,
            CreateField::new(name)
                .meta(meta)
                .linked_profile_field(profile.record_id()),
            &manager,
        )
        .unwrap();
    (profile.record_id(), registration.record_id())
}

#[test_log::test]
fn registration_mirrors_linked_profile_field() {
    let mut ctx = context();
    let manager = Caller::manager();
    let profile = ctx
        .create(
            FieldKind::Profile,
            CreateField::new("Favourite colour").field_type("select"),
            &manager,
        )
        .unwrap();
    ctx.write_setting(
        FieldKind::Profile,
        profile.record_id(),
        "selectable_options",
        json!(["a", "b"]),
    )
    .unwrap();

    let registration = ctx
        .create(
            FieldKind::Registration,
            CreateField::new("Colour")
                .field_type("textarea")
                .linked_profile_field(profile.record_id()),
            &manager,
        )
        .unwrap();

    assert_eq!(registration.linked_profile_field_id(), Some(profile.record_id()));
    assert_eq!(registration.field_type(), Some("select"));
    assert_eq!(registration.type_label(), Some("Dropdown"));
    assert_eq!(registration.meta_key(), Some("favourite_colour"));
    assert_eq!(
        registration.options(),
        &[SelectOption::new("a", "a"), SelectOption::new("b", "b")]
    );
}

#[test_log::test]
fn registration_follows_later_profile_changes() {
    let mut ctx = context();
    let (profile_id, registration_id) = linked_pair(&mut ctx, "Company", "company");

    ctx.write_setting(FieldKind::Profile, profile_id, "type", json!("multicheckbox"))
        .unwrap();

    let registration = ctx
        .get_from_id(FieldKind::Registration, registration_id)
        .unwrap()
        .unwrap();
    assert_eq!(registration.field_type(), Some("multicheckbox"));
    assert!(registration.is_multiple());
}

#[test_log::test]
fn builtin_email_registration_field_is_required() {
    let mut ctx = context();
    let manager = Caller::manager();
    let profile = ctx
        .create(
            FieldKind::Profile,
            CreateField::new("Email").field_type("email"),
            &manager,
        )
        .unwrap();
    let registration = ctx
        .create(
            FieldKind::Registration,
            CreateField::new("Email")
                .field_type("textarea")
                .linked_profile_field(profile.record_id()),
            &manager,
        )
        .unwrap();
    ctx.write_setting(
        FieldKind::Registration,
        registration.record_id(),
        "is_required",
        json!(false),
    )
    .unwrap();

    let registration = ctx
        .get_from_id(FieldKind::Registration, registration.record_id())
        .unwrap()
        .unwrap();
    assert_eq!(registration.meta_key(), Some("email"));
    assert_eq!(registration.field_type(), Some("email"));
    assert!(registration.is_required());
    assert!(!registration.is_deletable());
}

#[rstest]
#[case(FieldKind::Listing)]
#[case(FieldKind::Profile)]
fn duplicate_meta_key_creates_nothing(#[case] kind: FieldKind) {
    let mut ctx = context();
    let manager = Caller::manager();
    ctx.create(kind, CreateField::new("Shoe size"), &manager)
        .unwrap();
    let records = ctx.records().record_count();
    let items = ctx.store(kind).all_items().len();

    let err = ctx
        .create(kind, CreateField::new("Other name").meta("shoe_size"), &manager)
        .unwrap_err();
    assert!(matches!(
        err,
        FieldsError::DuplicateMetaKey { ref meta_key, .. } if meta_key == "shoe_size"
    ));
    assert_eq!(ctx.records().record_count(), records);
    assert_eq!(ctx.store(kind).all_items().len(), items);
}

#[test_log::test]
fn rewritten_meta_key_moves_the_uniqueness_check() {
    let mut ctx = context();
    let manager = Caller::manager();
    let company = ctx
        .create(FieldKind::Profile, CreateField::new("Company"), &manager)
        .unwrap();
    ctx.write_setting(
        FieldKind::Profile,
        company.record_id(),
        "meta_key",
        json!("employer"),
    )
    .unwrap();
    let records = ctx.records().record_count();

    let err = ctx
        .create(FieldKind::Profile, CreateField::new("Employer"), &manager)
        .unwrap_err();
    assert!(matches!(
        err,
        FieldsError::DuplicateMetaKey { ref meta_key, .. } if meta_key == "employer"
    ));
    assert_eq!(ctx.records().record_count(), records);

    let reused = ctx
        .create(FieldKind::Profile, CreateField::new("Company"), &manager)
        .unwrap();
    assert_eq!(reused.meta_key(), Some("company"));
    assert!(ctx
        .store(FieldKind::Profile)
        .get_item_by(Lookup::MetaKey("employer"))
        .is_some_and(|row| row.record_id == company.record_id()));
}

#[test_log::test]
fn registration_fields_cannot_share_a_mirrored_meta_key() {
    let mut ctx = context();
    let manager = Caller::manager();
    let profile = ctx
        .create(FieldKind::Profile, CreateField::new("Favourite colour"), &manager)
        .unwrap();
    ctx.create(
        FieldKind::Registration,
        CreateField::new("Colour").linked_profile_field(profile.record_id()),
        &manager,
    )
    .unwrap();
    let records = ctx.records().record_count();
    let items = ctx.store(FieldKind::Registration).all_items().len();

    let err = ctx
        .create(
            FieldKind::Registration,
            CreateField::new("Shade").linked_profile_field(profile.record_id()),
            &manager,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        FieldsError::DuplicateMetaKey { ref meta_key, .. } if meta_key == "favourite_colour"
    ));
    assert_eq!(ctx.records().record_count(), records);
    assert_eq!(ctx.store(FieldKind::Registration).all_items().len(), items);

    // The create-time slug of the first field is free: it resolves to the profile's key.
    let other = ctx
        .create(FieldKind::Profile, CreateField::new("Nickname"), &manager)
        .unwrap();
    let colour = ctx
        .create(
            FieldKind::Registration,
            CreateField::new("Colour").linked_profile_field(other.record_id()),
            &manager,
        )
        .unwrap();
    assert_eq!(colour.meta_key(), Some("nickname"));
}

#[test_log::test]
fn registration_field_linked_to_profile_email_becomes_required() {
    let mut ctx = context();
    let manager = Caller::manager();
    let profile = ctx
        .create(
            FieldKind::Profile,
            CreateField::new("Email").field_type("text"),
            &manager,
        )
        .unwrap();

    let contact = ctx
        .create(
            FieldKind::Registration,
            CreateField::new("Contact").linked_profile_field(profile.record_id()),
            &manager,
        )
        .unwrap();
    assert_eq!(contact.meta_key(), Some("email"));
    assert_eq!(contact.field_type(), Some("text"));
    assert!(!contact.is_deletable());
    assert!(contact.is_required());
}

#[test]
fn same_meta_key_in_other_kind_is_allowed() {
    let mut ctx = context();
    let manager = Caller::manager();
    ctx.create(FieldKind::Listing, CreateField::new("Phone"), &manager)
        .unwrap();
    ctx.create(FieldKind::Profile, CreateField::new("Phone"), &manager)
        .unwrap();
    assert_eq!(ctx.records().record_count(), 2);
}

#[rstest]
#[case(FieldKind::Listing, "listing_title")]
#[case(FieldKind::Profile, "first_name")]
fn default_field_needs_force_to_delete(#[case] kind: FieldKind, #[case] meta: &str) {
    let mut ctx = context();
    let manager = Caller::manager();
    let field = ctx
        .create(kind, CreateField::new("Built in").meta(meta), &manager)
        .unwrap();
    assert!(!field.is_deletable());

    let err = ctx
        .delete(kind, field.record_id(), &manager, false)
        .unwrap_err();
    assert!(matches!(
        err,
        FieldsError::CannotDelete {
            reason: DeleteRefusal::DefaultField,
            ..
        }
    ));
    assert!(ctx.get_from_id(kind, field.record_id()).unwrap().is_some());
    assert_eq!(ctx.records().record_count(), 1);

    let outcome = ctx.delete(kind, field.record_id(), &manager, true).unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted { cascaded: None });
    assert!(ctx.get_from_id(kind, field.record_id()).unwrap().is_none());
    assert_eq!(ctx.records().title_of(field.record_id()), None);
    assert_eq!(ctx.records().record_count(), 0);
    assert!(ctx.settings_store().read(field.record_id()).unwrap().is_empty());
}

#[test]
fn deleting_twice_reports_cannot_delete() {
    let mut ctx = context();
    let manager = Caller::manager();
    let field = ctx
        .create(FieldKind::Listing, CreateField::new("Video"), &manager)
        .unwrap();

    ctx.delete(FieldKind::Listing, field.record_id(), &manager, false)
        .unwrap();
    let err = ctx
        .delete(FieldKind::Listing, field.record_id(), &manager, false)
        .unwrap_err();
    assert!(matches!(
        err,
        FieldsError::CannotDelete {
            reason: DeleteRefusal::NotFound,
            ..
        }
    ));
}

#[test]
fn forced_delete_ignores_missing_capability() {
    let mut ctx = context();
    let field = ctx
        .create(FieldKind::Profile, CreateField::new("Bio"), &Caller::manager())
        .unwrap();

    let skipped = ctx
        .delete(FieldKind::Profile, field.record_id(), &Caller::visitor(), false)
        .unwrap();
    assert_eq!(skipped, DeleteOutcome::Skipped);

    let deleted = ctx
        .delete(FieldKind::Profile, field.record_id(), &Caller::visitor(), true)
        .unwrap();
    assert_eq!(deleted, DeleteOutcome::Deleted { cascaded: None });
}

#[test_log::test]
fn deleting_profile_field_cascades_to_linked_registration_field() {
    let mut ctx = context();
    let (profile_id, registration_id) = linked_pair(&mut ctx, "Company", "company");
    let (_, other_registration) = linked_pair(&mut ctx, "Nickname", "nickname");

    let outcome = ctx
        .delete(FieldKind::Profile, profile_id, &Caller::manager(), false)
        .unwrap();

    assert_eq!(
        outcome,
        DeleteOutcome::Deleted {
            cascaded: Some(registration_id)
        }
    );
    assert!(ctx
        .get_from_id(FieldKind::Registration, registration_id)
        .unwrap()
        .is_none());
    assert_eq!(ctx.records().title_of(registration_id), None);
    assert!(ctx
        .store(FieldKind::Registration)
        .get_item_by(Lookup::ProfileFieldId(profile_id))
        .is_none());
    assert!(ctx
        .get_from_id(FieldKind::Registration, other_registration)
        .unwrap()
        .is_some());
}

#[test_log::test]
fn default_linked_registration_field_survives_cascade() {
    let mut ctx = context();
    let (profile_id, registration_id) = linked_pair(&mut ctx, "Email", "email");

    let err = ctx
        .delete(FieldKind::Profile, profile_id, &Caller::manager(), false)
        .unwrap_err();
    assert!(matches!(err, FieldsError::CannotDelete { .. }));

    let outcome = ctx
        .delete(FieldKind::Profile, profile_id, &Caller::manager(), true)
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted { cascaded: None });

    let registration = ctx
        .get_from_id(FieldKind::Registration, registration_id)
        .unwrap()
        .unwrap();
    assert_eq!(registration.meta_key(), Some("email"));
    assert!(!registration.is_deletable());
}

#[test]
fn listing_and_registration_deletes_do_not_cascade() {
    let mut ctx = context();
    let (profile_id, registration_id) = linked_pair(&mut ctx, "Company", "company");

    let outcome = ctx
        .delete(FieldKind::Registration, registration_id, &Caller::manager(), false)
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted { cascaded: None });
    assert!(ctx
        .get_from_id(FieldKind::Profile, profile_id)
        .unwrap()
        .is_some());
}

#[test]
fn unauthorized_create_is_rejected() {
    let mut ctx = context();
    let err = ctx
        .create(FieldKind::Profile, CreateField::new("Bio"), &Caller::visitor())
        .unwrap_err();
    assert!(matches!(err, FieldsError::Unauthorized { kind: FieldKind::Profile }));
    assert_eq!(ctx.records().record_count(), 0);
}

#[test]
fn yaml_settings_store_backs_the_context() {
    let tmp = TempDir::new().unwrap();
    let store = YamlSettingsStore::open(tmp.path().join("settings")).unwrap();
    let mut ctx = FieldsContext::builder().settings(store).build();

    let field = ctx
        .create(
            FieldKind::Listing,
            CreateField::new("Opening hours").priority(3).field_type("textarea"),
            &Caller::manager(),
        )
        .unwrap();
    let path = tmp
        .path()
        .join("settings")
        .join(format!("{}.yaml", field.record_id()));
    assert!(path.exists());
    assert_eq!(field.field_type(), Some("textarea"));
    assert_eq!(field.priority(), 3);

    ctx.delete(FieldKind::Listing, field.record_id(), &Caller::manager(), false)
        .unwrap();
    assert!(!path.exists());
}
