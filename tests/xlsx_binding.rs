use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheet_records::serializer::{HandlerError, MarshalFn, UnmarshalFn};
use sheet_records::sheet::IndexOptions;
use sheet_records::{BindOptions, SheetBinder, SheetError, SheetSelector, record};

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("sheet-records-{name}-{nanos}.xlsx"))
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Detail {
    height: u32,
    nation: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Info {
    name: String,
    phone: Option<String>,
    age: i32,
    man: bool,
    secret: String,
    detail: Detail,
    cities: Vec<String>,
}

record!(Info {
    name: "column:user_name;comment:person name",
    phone: "column:phone",
    age: "column:age;default:0;comment:years",
    man: "column:man",
    secret: "skip",
    #[composite]
    detail: "column:details",
    #[composite]
    cities: "column:cities;serializer:pipe",
});

fn pipe_serializer() -> (MarshalFn, UnmarshalFn) {
    let marshal: MarshalFn = Arc::new(|v: &Value| -> Result<String, HandlerError> {
        let items = v.as_array().ok_or("expected a list")?;
        let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
        Ok(parts.join("|"))
    });
    let unmarshal: UnmarshalFn = Arc::new(|s: &str| -> Result<Value, HandlerError> {
        Ok(Value::Array(s.split('|').map(Value::from).collect()))
    });
    (marshal, unmarshal)
}

fn binder(data_row_offset: usize) -> SheetBinder {
    let options = BindOptions {
        index: IndexOptions {
            data_row_offset,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut binder = SheetBinder::new(options);
    let (m, u) = pipe_serializer();
    binder.register_serializer("pipe", Some(m), Some(u)).unwrap();
    binder
}

fn infos() -> Vec<Info> {
    vec![
        Info {
            name: "booyang".to_string(),
            phone: Some("13800000000".to_string()),
            age: 20,
            man: true,
            secret: "hidden".to_string(),
            detail: Detail {
                height: 180,
                nation: "China".to_string(),
            },
            cities: vec!["beijing".to_string(), "shanghai".to_string()],
        },
        Info {
            name: "alice".to_string(),
            phone: None,
            age: 0,
            man: false,
            secret: String::new(),
            detail: Detail::default(),
            cities: Vec::new(),
        },
    ]
}

#[test]
fn comment_row_round_trip_with_composites() {
    let path = tmp_file("infos");
    let summary = binder(1).marshal(&path, "Infos", &infos()).unwrap();
    assert_eq!(summary.sheet_name, "Infos");
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.data_row_offset, 2);

    let mut back: Vec<Info> = Vec::new();
    binder(summary.data_row_offset)
        .unmarshal(&path, "Infos", &mut back)
        .unwrap();

    let mut expected = infos();
    expected[0].secret.clear();
    assert_eq!(back, expected);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn written_layout_has_header_comment_and_data_rows() {
    let path = tmp_file("layout");
    binder(1).marshal(&path, "Infos", &infos()).unwrap();

    let ds = binder(2).parse(&path).unwrap();
    let sheet = ds.sheet_by_name("Infos").unwrap();
    assert_eq!(
        sheet.header_keys,
        vec!["user_name", "phone", "age", "man", "details", "cities"]
    );
    assert_eq!(sheet.data_total, 2);
    assert_eq!(sheet.get_string(3, "cities", false).unwrap(), "beijing|shanghai");
    assert_eq!(sheet.get_string(4, "age", false).unwrap(), "0");
    assert_eq!(sheet.get_string(4, "cities", false).unwrap(), "");
    assert!(matches!(
        sheet.get_cell(2, "user_name", false),
        Err(SheetError::RowRange { row: 2, .. })
    ));
    assert!(matches!(
        sheet.get_cell(5, "user_name", false),
        Err(SheetError::RowRange { row: 5, .. })
    ));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn parse_is_repeatable() {
    let path = tmp_file("repeat");
    binder(1).marshal(&path, "Infos", &infos()).unwrap();
    let b = binder(2);
    assert_eq!(b.parse(&path).unwrap(), b.parse(&path).unwrap());
    let _ = std::fs::remove_file(&path);
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Small {
    name: String,
    age: String,
}

record!(Small {
    name: "column:name",
    age: "column:age",
});

#[test]
fn two_records_to_infos_and_back() {
    let path = tmp_file("small");
    let rows = vec![
        Small {
            name: "a".to_string(),
            age: "18".to_string(),
        },
        Small {
            name: "b".to_string(),
            age: "14".to_string(),
        },
    ];
    let b = SheetBinder::default();
    let summary = b.marshal(&path, "Infos", &rows).unwrap();
    assert_eq!(summary.data_row_offset, 1);

    let mut back: Vec<Small> = Vec::new();
    b.unmarshal(&path, SheetSelector::Index(1), &mut back).unwrap();
    assert_eq!(back, rows);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn several_sheets_in_one_file() {
    let path = tmp_file("multi");
    let first = vec![Small {
        name: "a".to_string(),
        age: "1".to_string(),
    }];
    let second = vec![
        Small {
            name: "b".to_string(),
            age: "2".to_string(),
        },
        Small {
            name: "c".to_string(),
            age: "3".to_string(),
        },
    ];
    let b = SheetBinder::default();
    let summaries = b
        .marshal_sheets(&path, [("First", first.as_slice()), ("Second", second.as_slice())])
        .unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[1].rows_written, 2);

    assert_eq!(b.parse(&path).unwrap().sheet_names(), vec!["First", "Second"]);

    let mut out: Vec<(String, Vec<Small>)> = Vec::new();
    b.unmarshal_sheets(&path, &["Second", "First"], &mut out).unwrap();
    assert_eq!(out[0], ("Second".to_string(), second));
    assert_eq!(out[1], ("First".to_string(), first));

    let err = b.unmarshal_sheets(&path, &["Third"], &mut out).unwrap_err();
    assert!(matches!(err, SheetError::SheetNotFound { .. }));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn duplicate_headers_need_opt_in() {
    use rust_xlsxwriter::Workbook;

    let path = tmp_file("dup");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Dup").unwrap();
    ws.write_string(0, 0, "name").unwrap();
    ws.write_string(0, 1, "name").unwrap();
    ws.write_string(1, 0, "first").unwrap();
    ws.write_string(1, 1, "second").unwrap();
    wb.save(&path).unwrap();

    let err = SheetBinder::default().parse(&path).unwrap_err();
    match err {
        SheetError::DuplicateHeader { location, header } => {
            assert_eq!(header, "name");
            assert_eq!(location.coordinates, "B1");
            assert_eq!(location.sheet, "Dup");
        }
        other => panic!("unexpected error: {other}"),
    }

    let options = BindOptions {
        index: IndexOptions {
            allow_duplicate_headers: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let ds = SheetBinder::new(options).parse(&path).unwrap();
    let sheet = ds.sheet(1).unwrap();
    assert_eq!(sheet.get_string(2, "name", false).unwrap(), "first");
    assert_eq!(sheet.cell_at(2, 1).unwrap().value, "first");
    assert_eq!(sheet.cell_at(2, 2).unwrap().value, "second");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn numeric_cells_bind_to_typed_fields() {
    use rust_xlsxwriter::Workbook;

    #[derive(Debug, Default, PartialEq)]
    struct Score {
        id: u32,
        score: f32,
        active: bool,
    }
    record!(Score {
        id: "column:id",
        score: "column:score",
        active: "column:active",
    });

    let path = tmp_file("numbers");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "id").unwrap();
    ws.write_string(0, 1, "score").unwrap();
    ws.write_string(0, 2, "active").unwrap();
    ws.write_number(1, 0, 1).unwrap();
    ws.write_number(1, 1, 98.5).unwrap();
    ws.write_boolean(1, 2, true).unwrap();
    wb.save(&path).unwrap();

    let mut out: Vec<Score> = Vec::new();
    SheetBinder::default()
        .unmarshal(&path, SheetSelector::First, &mut out)
        .unwrap();
    assert_eq!(
        out,
        vec![Score {
            id: 1,
            score: 98.5,
            active: true,
        }]
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn trailing_all_empty_record_is_not_read_back() {
    let path = tmp_file("trailing-empty");
    let rows = vec![
        Small {
            name: "a".to_string(),
            age: "1".to_string(),
        },
        Small::default(),
        Small {
            name: "c".to_string(),
            age: String::new(),
        },
        Small::default(),
    ];
    let summary = SheetBinder::default().marshal(&path, "S", &rows).unwrap();
    assert_eq!(summary.rows_written, 4);

    let mut back: Vec<Small> = Vec::new();
    SheetBinder::default()
        .unmarshal(&path, SheetSelector::First, &mut back)
        .unwrap();
    assert_eq!(back, rows[..3].to_vec());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_file_is_an_io_error() {
    let mut out: Vec<Small> = Vec::new();
    let err = SheetBinder::default()
        .unmarshal(tmp_file("missing"), SheetSelector::First, &mut out)
        .unwrap_err();
    assert!(matches!(err, SheetError::Excel(_) | SheetError::Io(_)));
}
