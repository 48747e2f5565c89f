//! End-to-end mapping through the `QueryMapper` facade

use super::fixtures::{LineStatus, OrderLine, PartInformation, SalesOrder, UnitOfMeasure};
use chrono::NaiveDate;
use resultmap::entity::ConversionError;
use resultmap::plan::MaterializeError;
use resultmap::{
    ColumnMeta, ColumnType, MapperConfig, MappingError, MappingPlanError, MemoryResultSet,
    QueryMapper, ResultCursor, SourceError, Value,
};
use rust_decimal::Decimal;

const LINE_QUERY: &str = "SELECT * FROM order_line ol JOIN part p ON p.partno = ol.partno";

fn result_set(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> MemoryResultSet {
    let mut rs = MemoryResultSet::new(columns);
    for row in rows {
        rs.push_row(row).unwrap();
    }
    rs
}

#[test]
fn test_part_description_maps_to_nested_property() {
    let mapper = QueryMapper::default();
    let mut rs = result_set(
        vec![
            ColumnMeta::new("DESCRIPTION", ColumnType::VarChar).with_table("ORDER_LINE"),
            ColumnMeta::new("PART_DESCRIPTION", ColumnType::VarChar)
                .with_table("PART")
                .with_column_name("DESCRIPTION"),
        ],
        vec![vec![Value::from("Hex bolt order"), Value::from("Hex bolt")]],
    );

    let lines: Vec<OrderLine> = mapper.map_rows(LINE_QUERY, &mut rs).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].description.as_deref(), Some("Hex bolt order"));
    assert_eq!(
        lines[0].part.as_ref().and_then(|p| p.description.as_deref()),
        Some("Hex bolt")
    );
    assert_eq!(lines[0].status, LineStatus::Open);
}

#[test]
fn test_fixed_width_text_is_trimmed() {
    let mapper = QueryMapper::default();
    let mut rs = result_set(
        vec![ColumnMeta::new("UNIT_CODE", ColumnType::Char)],
        vec![vec![Value::from("FAB   ")]],
    );

    let lines: Vec<OrderLine> = mapper.map_rows(LINE_QUERY, &mut rs).unwrap();
    assert_eq!(lines[0].unit_code.as_deref(), Some("FAB"));
}

#[test]
fn test_nullable_decimal_null_handling() {
    let mapper = QueryMapper::default();
    let mut rs = result_set(
        vec![
            ColumnMeta::new("QUANTITY", ColumnType::Numeric),
            ColumnMeta::new("BACKORDER_QUANTITY", ColumnType::Numeric),
        ],
        vec![
            vec![Value::Null, Value::Null],
            vec![
                Value::Decimal(Decimal::new(1200, 2)),
                Value::Decimal(Decimal::new(350, 2)),
            ],
        ],
    );

    let lines: Vec<OrderLine> = mapper.map_rows(LINE_QUERY, &mut rs).unwrap();
    assert_eq!(lines[0].quantity, 0);
    assert_eq!(lines[0].backorder_quantity, None);
    assert_eq!(lines[1].quantity, 12);
    assert_eq!(lines[1].backorder_quantity, Some(Decimal::new(350, 2)));
}

#[test]
fn test_deep_paths_never_hit_unset_parents() {
    let mapper = QueryMapper::default();
    let ordered_at = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let mut rs = result_set(
        vec![
            ColumnMeta::new("ORDER_NO", ColumnType::BigInt).not_null(),
            ColumnMeta::new("ORDERED_AT", ColumnType::Timestamp),
            ColumnMeta::new("CUST_BILL_ADDR_CITY", ColumnType::VarChar),
            ColumnMeta::new("C_SA_STREET", ColumnType::VarChar),
            ColumnMeta::new("CITY", ColumnType::VarChar).with_table("SHIPPING_ADDRESS"),
        ],
        vec![vec![
            Value::Int(1001),
            Value::Timestamp(ordered_at),
            Value::Null,
            Value::from("1 Main St"),
            Value::from("Springfield"),
        ]],
    );

    let orders: Vec<SalesOrder> = mapper
        .map_rows("SELECT * FROM sales_order", &mut rs)
        .unwrap();
    let order = &orders[0];
    assert_eq!(order.order_no, 1001);
    assert_eq!(order.ordered_at, Some(ordered_at));

    let customer = order.customer.as_ref().unwrap();
    assert_eq!(customer.billing_address.as_ref().unwrap().city, None);
    let shipping = customer.shipping_address.as_ref().unwrap();
    assert_eq!(shipping.street.as_deref(), Some("1 Main St"));
    assert_eq!(shipping.city.as_deref(), Some("Springfield"));
    assert!(order.replaces.is_none());
}

#[test]
fn test_timestamp_column_to_epoch_millis() {
    let mapper = QueryMapper::default();
    let created = NaiveDate::from_ymd_opt(1970, 1, 1)
        .unwrap()
        .and_hms_milli_opt(0, 0, 2, 250)
        .unwrap();
    let mut rs = result_set(
        vec![ColumnMeta::new("CREATED", ColumnType::Timestamp)],
        vec![vec![Value::Timestamp(created)]],
    );

    let lines: Vec<OrderLine> = mapper.map_rows(LINE_QUERY, &mut rs).unwrap();
    assert_eq!(lines[0].created, 2250);
}

#[test]
fn test_row_hook_runs_after_setters() {
    let mapper = QueryMapper::default();
    let mut rs = result_set(
        vec![
            ColumnMeta::new("LINE_NO", ColumnType::Integer),
            ColumnMeta::new("FLEX_NOTE", ColumnType::VarChar),
        ],
        vec![
            vec![Value::Int(1), Value::from("rush")],
            vec![Value::Int(2), Value::Null],
        ],
    );

    let lines: Vec<OrderLine> = mapper
        .map_rows_with(
            LINE_QUERY,
            &mut rs,
            |line: &mut OrderLine, cursor: &mut MemoryResultSet| {
                if let Value::Text(note) = cursor.read(1, &ColumnType::VarChar)? {
                    line.notes.push(format!("{}: {}", line.line_no, note));
                }
                Ok(())
            },
        )
        .unwrap();

    assert_eq!(lines[0].notes, vec!["1: rush".to_string()]);
    assert!(lines[1].notes.is_empty());
}

#[test]
fn test_hook_failure_is_reported() {
    let mapper = QueryMapper::default();
    let mut rs = result_set(
        vec![ColumnMeta::new("LINE_NO", ColumnType::Integer)],
        vec![vec![Value::Int(1)]],
    );

    let err = mapper
        .map_rows_with(LINE_QUERY, &mut rs, |_: &mut OrderLine, _: &mut MemoryResultSet| {
            Err(SourceError::new("flex fields unavailable"))
        })
        .unwrap_err();
    assert!(matches!(err, MappingError::Materialize(MaterializeError::Hook(_))));
}

#[test]
fn test_plans_are_cached_per_query_and_type() {
    let mapper = QueryMapper::default();
    let columns = vec![ColumnMeta::new("DESCRIPTION", ColumnType::VarChar)];
    let rows = vec![vec![Value::from("x")]];

    let _: Vec<OrderLine> = mapper
        .map_rows(LINE_QUERY, &mut result_set(columns.clone(), rows.clone()))
        .unwrap();
    let _: Vec<OrderLine> = mapper
        .map_rows(LINE_QUERY, &mut result_set(columns.clone(), rows.clone()))
        .unwrap();
    assert_eq!(mapper.cache().metrics().builds, 1);

    // Same text, different target type
    let parts: Vec<PartInformation> = mapper
        .map_rows(LINE_QUERY, &mut result_set(columns.clone(), rows.clone()))
        .unwrap();
    assert_eq!(parts[0].description.as_deref(), Some("x"));
    assert_eq!(mapper.cache().metrics().builds, 2);

    // Different text, same target type
    let _: Vec<OrderLine> = mapper
        .map_rows("SELECT description FROM order_line", &mut result_set(columns, rows))
        .unwrap();

    let metrics = mapper.cache().metrics();
    assert_eq!(metrics.builds, 3);
    assert_eq!(metrics.size, 3);
    assert_eq!(metrics.hits, 1);
}

#[test]
fn test_codegen_marker_skips_plan_and_cache() {
    let mapper = QueryMapper::default();
    let columns = vec![
        ColumnMeta::new("LINE_NO", ColumnType::VarChar),
        ColumnMeta::new("DESCRIPTION", ColumnType::VarChar),
    ];
    let rows = vec![vec![Value::Int(4), Value::from("washer")]];

    // A VARCHAR column cannot feed an i32 property in a compiled plan
    let err = mapper
        .map_rows::<OrderLine, _>(LINE_QUERY, &mut result_set(columns.clone(), rows.clone()))
        .unwrap_err();
    assert!(matches!(
        err,
        MappingError::Plan(MappingPlanError::UnsupportedConversion { .. })
    ));

    let query = "SELECT /*-codeGen*/ * FROM order_line";
    let lines: Vec<OrderLine> = mapper
        .map_rows(query, &mut result_set(columns, rows))
        .unwrap();
    assert_eq!(lines[0].line_no, 4);
    assert_eq!(lines[0].description.as_deref(), Some("washer"));
    assert_eq!(mapper.cache().len(), 0);
}

#[test]
fn test_lob_columns_respect_configured_limit() {
    let columns = vec![
        ColumnMeta::new("PART_DRAWING", ColumnType::Blob),
        ColumnMeta::new("DESCRIPTION", ColumnType::Clob),
    ];
    let rows = vec![vec![Value::Bytes(vec![7; 8]), Value::from("long text")]];

    let mapper = QueryMapper::default();
    let lines: Vec<OrderLine> = mapper
        .map_rows(LINE_QUERY, &mut result_set(columns.clone(), rows.clone()))
        .unwrap();
    assert_eq!(
        lines[0].part.as_ref().and_then(|p| p.drawing.clone()),
        Some(vec![7; 8])
    );
    assert_eq!(lines[0].description.as_deref(), Some("long text"));

    let small = QueryMapper::new(MapperConfig {
        lob_max_bytes: 4,
        ..MapperConfig::default()
    });
    let err = small
        .map_rows::<OrderLine, _>(LINE_QUERY, &mut result_set(columns, rows))
        .unwrap_err();
    assert!(matches!(
        err,
        MappingError::Materialize(MaterializeError::LobTooLarge { limit: 4, .. })
    ));
}

#[test]
fn test_setter_errors_identify_property_and_column() {
    let mapper = QueryMapper::default();
    let mut rs = result_set(
        vec![ColumnMeta::new("QUANTITY", ColumnType::BigInt)],
        vec![vec![Value::Int(5_000_000_000)]],
    );

    let err = mapper.map_rows::<OrderLine, _>(LINE_QUERY, &mut rs).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("quantity"), "{}", message);
    assert!(message.contains("QUANTITY"), "{}", message);
}

#[test]
fn test_for_each_row_streams() {
    let mapper = QueryMapper::default();
    let mut rs = result_set(
        vec![ColumnMeta::new("LINE_NO", ColumnType::SmallInt)],
        (1..=5).map(|i| vec![Value::Int(i)]).collect(),
    );

    let mut total = 0;
    let count = mapper
        .for_each_row(LINE_QUERY, &mut rs, |line: OrderLine| total += line.line_no)
        .unwrap();
    assert_eq!(count, 5);
    assert_eq!(total, 15);
}

#[test]
fn test_plan_for_exposes_summary() {
    let mapper = QueryMapper::default();
    let columns = vec![
        ColumnMeta::new("PART_NO", ColumnType::VarChar),
        ColumnMeta::new("ROW_ID", ColumnType::BigInt),
    ];
    let plan = mapper.plan_for::<OrderLine>(LINE_QUERY, &columns).unwrap();
    let summary = plan.summary();
    assert_eq!(summary.guards, vec!["part".to_string()]);
    assert_eq!(summary.setters[0].property, "part.part_no");
    assert_eq!(summary.ignored_columns, vec!["ROW_ID".to_string()]);
}

#[test]
fn test_null_into_non_option_text_fails_with_context() {
    let mapper = QueryMapper::default();
    let columns = vec![
        ColumnMeta::new("CODE", ColumnType::VarChar),
        ColumnMeta::new("DESCRIPTION", ColumnType::VarChar),
    ];

    let units: Vec<UnitOfMeasure> = mapper
        .map_rows(
            "SELECT code, description FROM uom",
            &mut result_set(columns.clone(), vec![vec![Value::from("EA"), Value::Null]]),
        )
        .unwrap();
    assert_eq!(units[0].code, "EA");
    assert_eq!(units[0].description, None);

    let err = mapper
        .map_rows::<UnitOfMeasure, _>(
            "SELECT code, description FROM uom",
            &mut result_set(columns, vec![vec![Value::Null, Value::from("each")]]),
        )
        .unwrap_err();
    match err {
        MappingError::Materialize(MaterializeError::Setter {
            property,
            column,
            source,
        }) => {
            assert_eq!(property, "code");
            assert_eq!(column, "CODE");
            assert!(matches!(source, ConversionError::NullNotRepresentable { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_codegen_conversion_failure_is_raised() {
    let mapper = QueryMapper::default();
    let columns = vec![ColumnMeta::new("LINE_NO", ColumnType::BigInt)];
    let rows = vec![vec![Value::Int(5)], vec![Value::Int(i64::MAX)]];

    let err = mapper
        .map_rows::<OrderLine, _>(
            "SELECT /*-codeGen*/ line_no FROM order_line",
            &mut result_set(columns, rows),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        MappingError::Materialize(MaterializeError::Setter { ref property, ref column, .. })
            if property == "line_no" && column == "LINE_NO"
    ));
}
