mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::*;
use morph_api::{TypeRef, Value};
use morph_engine::{
    Configuration, ConversionContext, ConversionError, ConversionSettings, ExcludedFields,
    ExpandableFields, FieldHandler, FieldHandlerResult, FieldRef, ObjectConverter,
};

fn tagged() -> Tagged {
    Tagged {
        name: "ops".into(),
        password: "secret".into(),
        tags: vec!["a".into(), "b".into()],
        reads: Arc::new(AtomicUsize::new(0)),
    }
}

fn converter(excluded: ExcludedFields, expandable: ExpandableFields) -> ObjectConverter {
    let config = Configuration::builder()
        .excluded(excluded)
        .expandable(expandable)
        .build();
    ObjectConverter::with_config(config)
}

#[test]
fn test_excluded_fields_are_never_written() {
    let out: TaggedDto = converter(ExcludedFields::named(["password"]), ExpandableFields::all())
        .convert(&tagged())
        .unwrap();
    assert_eq!(out.name, "ops");
    assert_eq!(out.password, "");
    assert_eq!(out.tags, vec!["a", "b"]);

    let out: TaggedDto = converter(ExcludedFields::all(), ExpandableFields::all())
        .convert(&tagged())
        .unwrap();
    assert_eq!(out, TaggedDto::default());
}

#[test]
fn test_expand_none_never_invokes_getter() {
    let source = tagged();
    let out: TaggedDto = converter(ExcludedFields::none(), ExpandableFields::none())
        .convert(&source)
        .unwrap();
    assert!(out.tags.is_empty());
    assert_eq!(out.name, "ops");
    assert_eq!(source.reads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_expand_none_never_invokes_dynamically_typed_getter() {
    let source = Loose {
        name: "l".into(),
        extras: vec!["x".into()],
        reads: Arc::new(AtomicUsize::new(0)),
    };
    let out: LooseDto = converter(ExcludedFields::none(), ExpandableFields::none())
        .convert(&source)
        .unwrap();
    assert_eq!(out.name, "l");
    assert!(out.extras.is_empty());
    assert_eq!(source.reads.load(Ordering::SeqCst), 0);

    let out: LooseDto = converter(ExcludedFields::none(), ExpandableFields::all())
        .convert(&source)
        .unwrap();
    assert_eq!(out.extras, vec!["x"]);
    assert!(source.reads.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_expand_named_field() {
    let source = tagged();
    let out: TaggedDto = converter(ExcludedFields::none(), ExpandableFields::named(["tags"]))
        .convert(&source)
        .unwrap();
    assert_eq!(out.tags, vec!["a", "b"]);
    assert!(source.reads.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_empty_expand_list_leaves_destination_list_empty() {
    let source = Catalog { items: vec!["x".into(), "y".into()], title: "t".into() };
    let empty = ExpandableFields::from_list(Some(Vec::new()));
    let out: Catalog = converter(ExcludedFields::none(), empty).convert(&source).unwrap();
    assert!(out.items.is_empty());
    assert_eq!(out.title, "t");

    let out: Catalog = converter(ExcludedFields::none(), ExpandableFields::from_list(None))
        .convert(&source)
        .unwrap();
    assert_eq!(out.items, vec!["x", "y"]);
}

#[derive(Debug)]
struct Hashed;

impl FieldHandler for Hashed {
    fn name(&self) -> &'static str {
        "hashed"
    }

    fn accepts_destination(&self, class: &TypeRef) -> bool {
        *class == TypeRef::String
    }

    fn handle(
        &self,
        source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        let text = source.value()?.to_text().unwrap_or_default();
        destination.set_value(Value::Str(format!("#{text}")));
        Ok(FieldHandlerResult::Converted)
    }
}

#[test]
fn test_custom_handler_runs_before_builtins_after_guards() {
    let config = Configuration::builder().handler(Hashed).build();
    let out: CountText = ObjectConverter::with_config(config).convert(&Count { n: 13 }).unwrap();
    assert_eq!(out.n, "#13");

    let config = Configuration::builder()
        .handler(Hashed)
        .excluded(ExcludedFields::named(["n"]))
        .build();
    let out: CountText = ObjectConverter::with_config(config).convert(&Count { n: 13 }).unwrap();
    assert_eq!(out.n, "");

    let config = Configuration::builder().handler(Hashed).build();
    let out: Wide = ObjectConverter::with_config(config).convert(&Count { n: 13 }).unwrap();
    assert_eq!(out.n, 13);
}

#[derive(Debug)]
struct Stamp(&'static str);

impl FieldHandler for Stamp {
    fn name(&self) -> &'static str {
        self.0
    }

    fn handle(
        &self,
        _source: &FieldRef<'_>,
        destination: &mut FieldRef<'_>,
        _ctx: &mut ConversionContext,
    ) -> Result<FieldHandlerResult, ConversionError> {
        destination.set_value(Value::Str(self.0.into()));
        Ok(FieldHandlerResult::Converted)
    }
}

#[test]
fn test_earlier_handler_wins() {
    let config = Configuration::builder().handler(Stamp("first")).handler(Stamp("second")).build();
    let out: CountText = ObjectConverter::with_config(config).convert(&Count { n: 1 }).unwrap();
    assert_eq!(out.n, "first");

    let names: Vec<_> = Configuration::default_config()
        .handlers()
        .iter()
        .map(|h| h.name())
        .collect();
    let position = |name| names.iter().position(|n| *n == name).unwrap();
    assert!(position("same-type") < position("optional"));
    assert!(position("iterable-to-iterable") < position("array-to-array"));
    assert_eq!(names.last(), Some(&"object"));
}

#[test]
fn test_settings_drive_policy() {
    let settings = ConversionSettings::parse(
        r#"
        excluded_fields = ["password"]
        expandable_fields = []
        "#,
    )
    .unwrap();
    let source = tagged();
    let out: TaggedDto = ObjectConverter::with_config(Configuration::from_settings(&settings))
        .convert(&source)
        .unwrap();
    assert_eq!(out.name, "ops");
    assert_eq!(out.password, "");
    assert!(out.tags.is_empty());
    assert_eq!(source.reads.load(Ordering::SeqCst), 0);
}
