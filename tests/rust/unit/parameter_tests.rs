//! Named parameter rewriting through the public API

use resultmap::{
    MappingError, ParamValue, ParameterParseError, ParsedQuery, QueryMapper, Value,
};

#[test]
fn test_part_list_scenario() -> anyhow::Result<()> {
    let mapper = QueryMapper::default();
    let parsed = mapper.parse(
        "SELECT * FROM part WHERE partno IN (:PART_LIST) ORDER BY partno",
        [("PART_LIST", ParamValue::list(["123456", "123789"]))],
    )?;

    assert_eq!(
        parsed.sql(),
        "SELECT * FROM part WHERE partno IN (?,?) ORDER BY partno"
    );
    let part_list = parsed
        .parameter("PART_LIST")
        .ok_or_else(|| anyhow::anyhow!("PART_LIST not recorded"))?;
    assert_eq!(part_list.replace_count(), 2);
    assert_eq!(part_list.positions(), &[1]);
    assert_eq!(parsed.placeholder_count(), 2);
    assert_eq!(
        parsed.positional_values(),
        vec![Value::from("123456"), Value::from("123789")]
    );
    Ok(())
}

#[test]
fn test_rewrite_is_stable_across_values() {
    let sql = "UPDATE part SET descr = :descr WHERE partno IN (:parts) AND descr <> :descr";
    let runs: Vec<ParsedQuery> = (0..3)
        .map(|i| {
            ParsedQuery::parse(
                sql,
                [
                    ("descr", ParamValue::from(format!("d{}", i))),
                    ("parts", ParamValue::list(vec![i, i + 1])),
                ],
            )
            .unwrap()
        })
        .collect();

    for parsed in &runs[1..] {
        assert_eq!(parsed.sql(), runs[0].sql());
        assert_eq!(
            parsed.parameter("descr").unwrap().positions(),
            runs[0].parameter("descr").unwrap().positions()
        );
    }
    assert_eq!(runs[0].parameter("descr").unwrap().positions(), &[1, 4]);
    assert_eq!(runs[0].parameter("parts").unwrap().positions(), &[2]);
}

#[test]
fn test_quotes_and_comments_are_opaque() {
    let parsed = ParsedQuery::parse(
        "SELECT ':skip', \":skip\" /* :skip */ FROM t WHERE a = :keep",
        [("keep", 1)],
    )
    .unwrap();
    assert_eq!(
        parsed.sql(),
        "SELECT ':skip', \":skip\" /* :skip */ FROM t WHERE a = ?"
    );
    assert!(parsed.parameter("skip").is_none());
}

#[test]
fn test_missing_value_is_a_parse_error() {
    let mapper = QueryMapper::default();
    let err = mapper
        .parse("SELECT * FROM part WHERE partno = :partNo", [("other", 1)])
        .unwrap_err();
    assert!(matches!(
        err,
        MappingError::Parse(ParameterParseError::MissingParameter { ref name, .. }) if name == "partNo"
    ));
}

#[test]
fn test_batch_rebinding() {
    let mapper = QueryMapper::default();
    let mut batch = mapper
        .parse_template(
            "INSERT INTO part (partno, descr, tags) VALUES (:partno, :descr, :tags)",
            [("tags", ParamValue::list(["a", "b"]))],
        )
        .unwrap();
    assert_eq!(
        batch.sql(),
        "INSERT INTO part (partno, descr, tags) VALUES (?, ?, ?,?)"
    );

    let bound = batch
        .bind([
            ("partno", ParamValue::from("100")),
            ("tags", ParamValue::list(["x", "y"])),
        ])
        .unwrap();
    assert_eq!(
        bound.positional_values(),
        vec![
            Value::from("100"),
            Value::Null,
            Value::from("x"),
            Value::from("y"),
        ]
    );

    let err = batch
        .bind([("tags", ParamValue::list(["only"]))])
        .unwrap_err();
    assert!(matches!(err, ParameterParseError::ReplaceCountMismatch { expected: 2, found: 1, .. }));
}
