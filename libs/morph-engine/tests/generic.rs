mod common;

use common::*;
use morph_api::{Data, TypeRef, Value};
use morph_engine::{convert, ObjectConverter};

fn users() -> Page<User> {
    Page {
        items: vec![
            User { id: 1, name: "ada".into() },
            User { id: 2, name: "bob".into() },
        ],
        total: 2,
    }
}

#[test]
fn test_top_level_generic_destination() {
    let page: Page<UserDto> = convert(&users()).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(
        page.items,
        vec![
            UserDto { id: 1, name: "ada".into() },
            UserDto { id: 2, name: "bob".into() },
        ]
    );
}

#[test]
fn test_nested_generic_field() {
    let out: EnvelopeDto = convert(&Envelope { page: users() }).unwrap();
    assert_eq!(out.page.items.len(), 2);
    assert_eq!(out.page.items[1].id, 2);
}

#[test]
fn test_generic_type_nested_in_generic_type() {
    let source = Outer { inner: users(), label: "first".into() };
    let out: Outer<UserDto> = convert(&source).unwrap();
    assert_eq!(out.label, "first");
    assert_eq!(out.inner.total, 2);
    assert_eq!(out.inner.items[0], UserDto { id: 1, name: "ada".into() });
}

#[test]
fn test_generic_page_of_scalars() {
    let source = Page { items: vec![1i32, 2, 3], total: 3 };
    let page: Page<String> = convert(&source).unwrap();
    assert_eq!(page.items, vec!["1", "2", "3"]);
}

#[test]
fn test_dynamic_conversion_into_generic_type() {
    let source = Value::from(serde_json::json!({
        "items": [{"id": 7, "name": "eve"}],
        "total": 1
    }));
    let out = ObjectConverter::new()
        .convert_to_type(&source, &<Page<UserDto> as Data>::type_ref())
        .unwrap();
    let page = Page::<UserDto>::from_value(out).unwrap();
    assert_eq!(page.items, vec![UserDto { id: 7, name: "eve".into() }]);
    assert!(matches!(<Page<UserDto> as Data>::type_ref(), TypeRef::Object(_)));
}
