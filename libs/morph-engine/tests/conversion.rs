mod common;

use std::collections::{HashMap, HashSet};

use common::*;
use morph_api::{Reflect, TypeRef, Value};
use morph_engine::{convert, ConversionError, ObjectConverter, SimpleConverters, Configuration};

#[derive(Reflect, Clone, Debug)]
#[reflect(no_default)]
struct Locked {
    v: i32,
}

#[test]
fn test_integer_into_string() {
    init_tracing();
    let out: CountText = convert(&Count { n: 13 }).unwrap();
    assert_eq!(out.n, "13");
}

#[test]
fn test_string_into_integer() {
    let out: Wide = convert(&CountText { n: "19".into() }).unwrap();
    assert_eq!(out.n, 19);
}

#[test]
fn test_map_source_by_key() {
    let source = Value::from(serde_json::json!({"s": 1}));
    let out: Text = convert(&source).unwrap();
    assert_eq!(out.s, "1");
}

#[test]
fn test_widening_is_automatic_narrowing_is_not() {
    let wide: Wide = convert(&Count { n: 5 }).unwrap();
    assert_eq!(wide.n, 5);

    let narrow: Narrow = convert(&Wide { n: 5 }).unwrap();
    assert_eq!(narrow.n, 0);
}

#[test]
fn test_simple_converter_enables_narrowing() {
    let converters = SimpleConverters::new().register(|n: i64| n as i32);
    let config = Configuration::builder().simple_converters(converters).build();
    let converter = ObjectConverter::with_config(config);

    let narrow: Narrow = converter.convert(&Wide { n: 5 }).unwrap();
    assert_eq!(narrow.n, 5);

    // JSON numbers arrive as i64.
    let narrow: Narrow = converter.convert(&Value::from(serde_json::json!({"n": 9}))).unwrap();
    assert_eq!(narrow.n, 9);
}

#[test]
fn test_round_trip() {
    let original = account();
    let dto: AccountDto = convert(&original).unwrap();
    assert_eq!(dto.id, 7);
    assert_eq!(dto.status, StatusDto::Active);
    assert_eq!(dto.address.city, "Paris");
    assert_eq!(dto.tags.len(), 2);
    assert_eq!(dto.nickname.as_deref(), Some("ada"));

    let back: Account = convert(&dto).unwrap();
    assert_eq!(back, original);
}

#[test]
fn test_missing_source_field_leaves_destination() {
    let out: Text = ObjectConverter::new()
        .convert_into(&Count { n: 1 }, Text { s: "kept".into() })
        .unwrap();
    assert_eq!(out.s, "kept");
}

#[test]
fn test_extra_callback_runs_last() {
    let out: CountText = ObjectConverter::new()
        .convert_with(&Count { n: 2 }, |source, dest: &mut CountText| {
            assert!(source.is_object());
            dest.n.push('!');
            Ok(())
        })
        .unwrap();
    assert_eq!(out.n, "2!");

    let with_config: CountText =
        morph_engine::convert_with(&Count { n: 3 }, Configuration::default_config(), |_, _| Ok(()))
            .unwrap();
    assert_eq!(with_config.n, "3");
}

#[test]
fn test_null_source_is_misuse() {
    let err = convert::<Text>(&Value::Null).unwrap_err();
    assert!(matches!(err, ConversionError::Misuse(_)));
}

#[test]
fn test_destination_without_default_is_misuse() {
    let err = convert::<Locked>(&Count { n: 1 }).unwrap_err();
    assert!(matches!(err, ConversionError::Misuse(_)));
}

#[test]
fn test_failure_names_both_fields() {
    let err = convert::<Wide>(&CountText { n: "abc".into() }).unwrap_err();
    match err {
        ConversionError::Field { source_field, destination_field, cause } => {
            assert_eq!(source_field, "n");
            assert_eq!(destination_field, "n");
            assert!(matches!(*cause, ConversionError::Value(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_convert_to_type() {
    let converter = ObjectConverter::new();
    let out = converter
        .convert_to_type(&Value::Str("19".into()), &TypeRef::I64)
        .unwrap();
    assert_eq!(out, Value::I64(19));

    let list = Value::List(vec![Value::I32(1), Value::I32(2)]);
    let out = converter
        .convert_to_type(&list, &TypeRef::list(TypeRef::String))
        .unwrap();
    assert_eq!(out, Value::List(vec![Value::Str("1".into()), Value::Str("2".into())]));
}

#[test]
fn test_typed_wrappers() {
    let converter = ObjectConverter::new();
    let sources = vec![Count { n: 1 }, Count { n: 2 }];

    let out: Vec<CountText> = converter.convert_slice(&sources).unwrap();
    assert_eq!(out, vec![CountText { n: "1".into() }, CountText { n: "2".into() }]);

    let out: Vec<Wide> = converter.convert_iter(sources.clone()).unwrap();
    assert_eq!(out.iter().map(|w| w.n).collect::<Vec<_>>(), vec![1, 2]);

    let map: HashMap<&str, Count> = HashMap::from([("a", Count { n: 4 })]);
    let out: HashMap<&str, CountText> = converter.convert_map(&map).unwrap();
    assert_eq!(out["a"].n, "4");
}

#[test]
fn test_map_values_are_converted() {
    let source = Scores { by_name: HashMap::from([("k".to_string(), 3)]) };
    let out: ScoresText = convert(&source).unwrap();
    assert_eq!(out.by_name, HashMap::from([("k".to_string(), "3".to_string())]));
}

#[test]
fn test_arrays_and_lists_convert_both_ways() {
    let source = Grid { fixed: [1, 2], pair: [3, 4], list: vec![5, 6] };
    let out: GridDto = convert(&source).unwrap();
    assert_eq!(out.fixed, vec![1i64, 2]);
    assert_eq!(out.pair, [3i64, 4]);
    assert_eq!(&*out.list, &["5".to_string(), "6".to_string()]);
}

#[test]
fn test_string_into_char_list_and_back() {
    let letters: Letters = convert(&Word { text: "hi".into() }).unwrap();
    assert_eq!(letters.text, vec!['h', 'i']);

    let word: Word = convert(&letters).unwrap();
    assert_eq!(word.text, "hi");
}

#[test]
fn test_enum_ordinal_bridge() {
    let code: TicketCode = convert(&Ticket { status: Status::Closed }).unwrap();
    assert_eq!(code.status, 2);

    let ticket: Ticket = convert(&TicketCode { status: 1 }).unwrap();
    assert_eq!(ticket.status, Status::Active);

    let err = convert::<Ticket>(&TicketCode { status: 9 }).unwrap_err();
    assert!(matches!(err, ConversionError::Field { .. }));
}

#[test]
fn test_optional_into_optional() {
    let out: Maybe = convert(&Maybe { n: Some(4) }).unwrap();
    assert_eq!(out.n, Some(4));

    let out: Maybe = convert(&Maybe { n: None }).unwrap();
    assert_eq!(out.n, None);
}

mod first {
    use morph_api::Reflect;

    #[derive(Reflect, Clone, Debug, Default, PartialEq)]
    pub struct Label {
        pub n: i32,
    }

    #[derive(Reflect, Clone, Debug, Default, PartialEq)]
    pub struct Tag {
        pub label: Label,
    }
}

mod second {
    use morph_api::Reflect;

    #[derive(Reflect, Clone, Debug, Default, PartialEq)]
    pub struct Label {
        pub n: String,
    }

    #[derive(Reflect, Clone, Debug, Default, PartialEq)]
    pub struct Tag {
        pub label: Label,
    }
}

#[test]
fn test_types_with_the_same_name_stay_distinct() {
    let first = <first::Label as morph_api::Data>::type_ref();
    let second = <second::Label as morph_api::Data>::type_ref();
    assert_ne!(first, second);
    assert_eq!(first, <first::Label as morph_api::Data>::type_ref());
    assert_eq!(HashSet::from([first, second]).len(), 2);

    let out: second::Tag = convert(&first::Tag { label: first::Label { n: 3 } }).unwrap();
    assert_eq!(out.label.n, "3");
}
