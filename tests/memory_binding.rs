use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use sheet_records::codec::MemoryCodec;
use sheet_records::coercion::CoercionOptions;
use sheet_records::serializer::{HandlerError, MarshalFn, UnmarshalFn};
use sheet_records::{BindOptions, RawSheet, SheetBinder, SheetError, SheetSelector, record};

fn raw(name: &str, data: &[&[&str]]) -> RawSheet {
    RawSheet::new(
        name,
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    )
}

fn memory(path: &str, sheets: Vec<RawSheet>) -> Arc<MemoryCodec> {
    let codec = Arc::new(MemoryCodec::new());
    codec.insert(path, sheets);
    codec
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Person {
    name: String,
    age: i32,
    nickname: Option<String>,
}

record!(Person {
    name: "column:name",
    age: "column:age;default:7",
    nickname: "column:nick",
});

#[test]
fn four_rows_one_bad_integer() {
    let codec = memory(
        "people.xlsx",
        vec![raw(
            "Sheet1",
            &[
                &["name", "age", "nick"],
                &["a", "1", "aa"],
                &["b", "2", ""],
                &["c", "old", "cc"],
                &["d", "", ""],
            ],
        )],
    );
    let binder = SheetBinder::with_codec(BindOptions::default(), codec);

    let mut out: Vec<Person> = Vec::new();
    let err = binder
        .unmarshal("people.xlsx", SheetSelector::First, &mut out)
        .unwrap_err();

    assert_eq!(out.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["a", "b", "d"]);
    assert_eq!(out[0].nickname.as_deref(), Some("aa"));
    assert_eq!(out[1].nickname, None);
    assert_eq!(out[2].age, 7);

    let errors = err.errors();
    assert_eq!(errors.len(), 1);
    match errors[0] {
        SheetError::TypeMismatch { location, key, raw, .. } => {
            assert_eq!(location.file, "people.xlsx");
            assert_eq!(location.sheet, "Sheet1");
            assert_eq!(location.coordinates, "B4");
            assert_eq!(key, "age");
            assert_eq!(raw, "old");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_header_column_is_reported_once() {
    let codec = memory(
        "nick.xlsx",
        vec![raw("S", &[&["name", "age"], &["a", "1"], &["b", "2"], &["c", "3"]])],
    );
    let binder = SheetBinder::with_codec(BindOptions::default(), codec);

    let mut out: Vec<Person> = Vec::new();
    let err = binder
        .unmarshal("nick.xlsx", SheetSelector::First, &mut out)
        .unwrap_err();
    assert!(out.is_empty());
    let errors = err.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], SheetError::FieldNotFound { key, .. } if key == "nick"));
}

#[test]
fn required_cells_must_not_be_empty() {
    let codec = memory(
        "req.xlsx",
        vec![raw("S", &[&["name", "age", "nick"], &["", "1", "x"], &["b", "2", "y"]])],
    );
    let options = BindOptions {
        coercion: CoercionOptions {
            check_empty_required: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let binder = SheetBinder::with_codec(options, codec);

    let mut out: Vec<Person> = Vec::new();
    let err = binder.unmarshal("req.xlsx", SheetSelector::First, &mut out).unwrap_err();
    assert_eq!(out.len(), 1);
    assert!(matches!(
        err.errors()[0],
        SheetError::EmptyValue { location, key } if location.coordinates == "A2" && key == "name"
    ));
}

#[derive(Debug, Default)]
struct Flag {
    on: bool,
}

record!(Flag { on: "column:on" });

#[test]
fn truthy_literals_are_configurable() {
    let codec = memory("flags.xlsx", vec![raw("S", &[&["on"], &["oui"], &["true"], &["yes"]])]);
    let options = BindOptions {
        coercion: CoercionOptions {
            truthy_literals: HashSet::from(["oui".to_string(), "true".to_string()]),
            ..Default::default()
        },
        ..Default::default()
    };
    let binder = SheetBinder::with_codec(options, codec);

    let mut out: Vec<Flag> = Vec::new();
    binder.unmarshal("flags.xlsx", SheetSelector::First, &mut out).unwrap();
    assert_eq!(out.iter().map(|f| f.on).collect::<Vec<_>>(), vec![true, true, false]);
}

#[derive(Debug, Default)]
struct Tagged {
    id: u32,
    tags: Vec<String>,
}

record!(Tagged {
    id: "column:id",
    #[composite]
    tags: "column:tags;serializer:upper",
});

#[test]
fn unknown_serializer_aborts_before_any_row() {
    let codec = memory("tags.xlsx", vec![raw("S", &[&["id", "tags"], &["1", "a"]])]);
    let binder = SheetBinder::with_codec(BindOptions::default(), codec);

    let mut out = vec![Tagged::default()];
    let err = binder.unmarshal("tags.xlsx", SheetSelector::First, &mut out).unwrap_err();
    assert!(matches!(err, SheetError::SerializerNotFound { ref name } if name == "upper"));
    assert_eq!(out.len(), 1);
}

fn upper_serializer() -> (MarshalFn, UnmarshalFn) {
    let marshal: MarshalFn = Arc::new(|v: &Value| -> Result<String, HandlerError> {
        let items = v.as_array().ok_or("expected a list")?;
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let s = item.as_str().ok_or("expected strings")?;
            if s.is_empty() {
                return Err("empty tag".into());
            }
            parts.push(s.to_uppercase());
        }
        Ok(parts.join(","))
    });
    let unmarshal: UnmarshalFn = Arc::new(|s: &str| -> Result<Value, HandlerError> {
        Ok(Value::Array(s.split(',').map(|t| Value::from(t.to_lowercase())).collect()))
    });
    (marshal, unmarshal)
}

#[test]
fn failing_record_is_skipped_and_file_still_written() {
    let codec = Arc::new(MemoryCodec::new());
    let mut binder = SheetBinder::with_codec(BindOptions::default(), codec.clone());
    let (m, u) = upper_serializer();
    binder.register_serializer("upper", Some(m), Some(u)).unwrap();

    let rows = vec![
        Tagged {
            id: 1,
            tags: vec!["a".to_string(), "b".to_string()],
        },
        Tagged {
            id: 2,
            tags: vec![String::new()],
        },
        Tagged {
            id: 3,
            tags: vec!["c".to_string()],
        },
    ];
    let err = binder.marshal("out.xlsx", "Tags", &rows).unwrap_err();
    match &err.errors()[..] {
        [SheetError::Serialization { location, serializer, key, .. }] => {
            assert_eq!(serializer, "upper");
            assert_eq!(key, "tags");
            assert_eq!(location.coordinates, "B3");
        }
        other => panic!("unexpected errors: {other:?}"),
    }

    let stored = codec.get("out.xlsx").unwrap();
    assert_eq!(stored[0].rows, vec![vec!["id", "tags"], vec!["1", "A,B"], vec!["3", "C"]]);

    let mut back: Vec<Tagged> = Vec::new();
    binder.unmarshal("out.xlsx", "Tags", &mut back).unwrap();
    assert_eq!(back.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(back[0].tags, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn registering_a_reserved_or_taken_name_fails() {
    let mut binder = SheetBinder::default();
    let (m, u) = upper_serializer();
    binder
        .register_serializer("upper", Some(m.clone()), Some(u.clone()))
        .unwrap();
    assert!(matches!(
        binder.register_serializer("upper", Some(m.clone()), Some(u.clone())),
        Err(SheetError::SerializerConflict { .. })
    ));
    assert!(matches!(
        binder.register_serializer("serializer", Some(m.clone()), Some(u)),
        Err(SheetError::SerializerConflict { .. })
    ));
    assert!(matches!(
        binder.register_serializer("half", Some(m), None),
        Err(SheetError::SerializerMissingHandler { .. })
    ));
    assert_eq!(binder.registry().names(), vec!["upper"]);
}

#[test]
fn empty_input_writes_a_header_only_sheet() {
    let codec = Arc::new(MemoryCodec::new());
    let binder = SheetBinder::with_codec(BindOptions::default(), codec.clone());
    let none: Vec<Person> = Vec::new();
    let summary = binder.marshal("empty.xlsx", "Empty", &none).unwrap();
    assert_eq!(summary.rows_written, 0);
    assert_eq!(codec.get("empty.xlsx").unwrap()[0].rows, vec![vec!["name", "age", "nick"]]);

    let mut back: Vec<Person> = vec![Person::default()];
    binder.unmarshal("empty.xlsx", SheetSelector::First, &mut back).unwrap();
    assert!(back.is_empty());
}

#[test]
fn zero_values_take_the_default_on_write() {
    let codec = Arc::new(MemoryCodec::new());
    let binder = SheetBinder::with_codec(BindOptions::default(), codec.clone());
    let rows = vec![Person {
        name: "z".to_string(),
        age: 0,
        nickname: None,
    }];
    binder.marshal("zero.xlsx", "S", &rows).unwrap();
    assert_eq!(codec.get("zero.xlsx").unwrap()[0].rows[1], vec!["z", "7", ""]);
}

#[test]
fn unmarshal_from_a_parsed_dataset() {
    let codec = memory(
        "two.xlsx",
        vec![
            raw("One", &[&["name", "age", "nick"], &["a", "1", ""]]),
            raw("Two", &[&["name", "age", "nick"], &["b", "2", ""], &["c", "x", ""]]),
        ],
    );
    let binder = SheetBinder::with_codec(BindOptions::default(), codec);
    let ds = binder.parse("two.xlsx").unwrap();
    assert_eq!(ds, binder.parse("two.xlsx").unwrap());

    let mut out: Vec<Person> = Vec::new();
    let err = binder
        .unmarshal_sheet(ds.sheet_by_name("Two").unwrap(), &mut out)
        .unwrap_err();
    assert_eq!(out.len(), 1);
    assert_eq!(err.errors().len(), 1);

    binder.unmarshal_sheet(ds.sheet(1).unwrap(), &mut out).unwrap();
    assert_eq!(out[0].name, "a");
}

#[derive(Debug, Default)]
struct Narrow {
    small: u8,
}

record!(Narrow { small: "column:small" });

#[test]
fn integer_width_is_enforced() {
    let codec = memory("w.xlsx", vec![raw("S", &[&["small"], &["255"], &["256"], &["-1"]])]);
    let binder = SheetBinder::with_codec(BindOptions::default(), codec);
    let mut out: Vec<Narrow> = Vec::new();
    let err = binder.unmarshal("w.xlsx", SheetSelector::First, &mut out).unwrap_err();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].small, 255);
    assert_eq!(err.errors().len(), 2);
}
