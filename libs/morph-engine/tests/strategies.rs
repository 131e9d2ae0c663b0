mod common;

use common::*;
use morph_engine::convert;

fn order() -> Order {
    Order {
        id: 42,
        billing: Address { city: "Lyon".into(), zip: "69001".into() },
        shipping: Address { city: "Nice".into(), zip: "06000".into() },
    }
}

#[test]
fn test_alias_dotted_and_flattened_paths() {
    let view: OrderView = convert(&order()).unwrap();
    assert_eq!(
        view,
        OrderView {
            order_id: 42,
            destination: "Nice".into(),
            billing_city: "Lyon".into(),
            billingZip: "69001".into(),
        }
    );
}

#[test]
fn test_conditional_source_name() {
    let from_dto: Person = convert(&PersonDto { full_name: "Grace Hopper".into() }).unwrap();
    assert_eq!(from_dto.name, "Grace Hopper");

    let from_employee: Person = convert(&Employee { name: "Alan".into() }).unwrap();
    assert_eq!(from_employee.name, "Alan");
}

#[test]
fn test_dotted_path_into_map_source() {
    let source = morph_api::Value::from(serde_json::json!({
        "order_id": 5,
        "shipping": {"city": "Oslo"},
        "billing": {"city": "Bergen", "zip": "5003"}
    }));
    let view: OrderView = convert(&source).unwrap();
    assert_eq!(view.order_id, 5);
    assert_eq!(view.destination, "Oslo");
    assert_eq!(view.billing_city, "Bergen");
    assert_eq!(view.billingZip, "5003");
}
