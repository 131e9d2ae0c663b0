mod common;

use std::sync::{Arc, RwLock};

use common::*;
use morph_api::{Data, Reflect, SharedObject, TypeRef, Value};
use morph_engine::PropertyConversionEngine;
use serde_json::json;

#[derive(Reflect, Clone, Debug, Default)]
struct Pair {
    left: Option<Arc<RwLock<Node>>>,
    right: Option<Arc<RwLock<Node>>>,
}

#[test]
fn test_cycle_becomes_marker() {
    let n1 = Arc::new(RwLock::new(Node::default()));
    let n2 = Arc::new(RwLock::new(Node { next: Some(n1.clone()) }));
    n1.write().unwrap().next = Some(n2.clone());

    let flat = PropertyConversionEngine::new()
        .flatten(&Value::Shared(SharedObject::new(n1.clone())))
        .unwrap();
    assert_eq!(flat, json!({"next": {"next": {"_cyclic_ref": "Node"}}}));

    // Break the cycle so both nodes are dropped.
    n1.write().unwrap().next = None;
}

#[test]
fn test_shared_node_on_two_paths_is_not_a_cycle() {
    let leaf = Arc::new(RwLock::new(Node::default()));
    let pair = Pair { left: Some(leaf.clone()), right: Some(leaf) };
    let flat = PropertyConversionEngine::shared().flatten_data(&pair).unwrap();
    assert_eq!(flat, json!({"left": {"next": null}, "right": {"next": null}}));
}

#[test]
fn test_flatten_object_graph() {
    let flat = PropertyConversionEngine::new().flatten_data(&account()).unwrap();
    assert_eq!(
        flat,
        json!({
            "id": 7,
            "name": "Ada",
            "tags": ["admin", "ops"],
            "status": "Active",
            "address": {"city": "Paris", "zip": "75001"},
            "nickname": "ada"
        })
    );
}

#[test]
fn test_flatten_uses_getters() {
    let source = Tagged { name: "n".into(), tags: vec!["t".into()], ..Default::default() };
    let flat = PropertyConversionEngine::new().flatten_data(&source).unwrap();
    assert_eq!(flat, json!({"name": "n", "password": "", "tags": ["t"]}));
}

#[test]
fn test_flatten_generic_page() {
    let page = Page { items: vec![User { id: 1, name: "ada".into() }], total: 1 };
    let flat = PropertyConversionEngine::new().flatten_data(&page).unwrap();
    assert_eq!(flat, json!({"items": [{"id": 1, "name": "ada"}], "total": 1}));
}

#[test]
fn test_shared_field_type_is_shared_object() {
    let ty = <Arc<RwLock<Node>> as Data>::type_ref();
    assert_eq!(ty, TypeRef::shared(<Node as Data>::type_ref()));
    assert!(matches!(ty, TypeRef::Shared(_)));
}
