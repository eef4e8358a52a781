use indexmap::IndexMap;
use sql_instance::prelude::*;

fn conditions() -> IndexMap<String, SqlInput> {
    let mut fields = IndexMap::new();
    fields.insert("status".to_string(), SqlInput::from("open"));
    fields.insert("owner".to_string(), SqlInput::from("o'neil"));
    fields.insert("priority".to_string(), SqlInput::from(3));
    fields
}

#[test]
fn test01_or_join_has_one_operator_between_each_condition() {
    let fields = conditions();
    let sql = build_multi_condition(&fields, JoinOperator::Or).unwrap();

    assert_eq!(sql.matches(" OR ").count(), fields.len() - 1);
    for (key, value) in &fields {
        let single = build_query(" ?? = ? ", &[SqlInput::from(key.as_str()), value.clone()]).unwrap();
        assert!(sql.contains(&single), "{single} missing from {sql}");
    }
}

#[test]
fn test01_default_join_is_and() {
    let fields = conditions();
    let sql = build_multi_condition(&fields, JoinOperator::default()).unwrap();
    assert_eq!(
        sql,
        " `status` = 'open'  AND  `owner` = 'o\\'neil'  AND  `priority` = 3 "
    );
}

#[test]
fn test01_where_clause_from_conditions() {
    let fields = conditions();
    let where_clause = build_multi_condition(&fields, JoinOperator::And).unwrap();
    let sql = build_query(
        "SELECT ?? FROM ?? WHERE ?",
        &[
            SqlInput::List(vec!["id".into(), "title".into()]),
            "tickets".into(),
            build_raw_text(where_clause).into(),
        ],
    )
    .unwrap();
    assert!(sql.starts_with("SELECT `id`, `title` FROM `tickets` WHERE  `status` = 'open'"));
}

#[test]
fn test01_values_of_every_kind() {
    let ts = chrono::NaiveDate::from_ymd_opt(2023, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 58))
        .unwrap();
    let sql = build_query(
        "INSERT INTO t VALUES (?, ?, ?, ?, ?, ?, ?)",
        &[
            SqlInput::from(-7),
            SqlInput::from(0.5),
            SqlInput::from(false),
            SqlInput::from(None::<i64>),
            SqlInput::from(ts),
            SqlInput::from(serde_json::json!({"k": "v"})),
            SqlInput::from(vec![0x0a_u8, 0xff]),
        ],
    )
    .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO t VALUES (-7, 0.5, false, NULL, '2023-12-31 23:59:58.000', '{\\\"k\\\":\\\"v\\\"}', X'0aff')"
    );
}

#[test]
fn test01_double_dash_arithmetic_still_takes_inputs() {
    let sql = build_query(
        "UPDATE t SET a = a--? WHERE id = ?",
        &[SqlInput::from(1), SqlInput::from(7)],
    )
    .unwrap();
    assert_eq!(sql, "UPDATE t SET a = a--1 WHERE id = 7");

    let commented = build_query("SELECT ? -- ?\nFROM t", &[SqlInput::from(1)]).unwrap();
    assert_eq!(commented, "SELECT 1 -- ?\nFROM t");
}

#[test]
fn test01_misuse_is_a_builder_error() {
    let err = build_query("SELECT * FROM ??", &[SqlInput::from(1.5)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BuilderMisuse);
}
