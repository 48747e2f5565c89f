//! Target types shared by the test modules

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStatus {
    #[default]
    Open,
    Shipped,
}

#[derive(Debug, Default, PartialEq)]
pub struct PartInformation {
    pub description: Option<String>,
    pub part_no: Option<String>,
    pub drawing: Option<Vec<u8>>,
}
resultmap::entity!(PartInformation {
    description: leaf,
    part_no: leaf,
    drawing: leaf,
});

#[derive(Debug, Default, PartialEq)]
pub struct OrderLine {
    pub line_no: i32,
    pub description: Option<String>,
    pub unit_code: Option<String>,
    pub quantity: i32,
    pub backorder_quantity: Option<Decimal>,
    pub created: i64,
    pub part: Option<PartInformation>,
    pub status: LineStatus,
    /// Filled by a row hook, never matched
    pub notes: Vec<String>,
}
resultmap::entity!(OrderLine {
    line_no: leaf,
    description: leaf,
    unit_code: leaf,
    quantity: leaf,
    backorder_quantity: leaf,
    created: leaf,
    part: nested,
    status: opaque,
});

#[derive(Debug, Default, PartialEq)]
pub struct UnitOfMeasure {
    pub code: String,
    pub description: Option<String>,
}
resultmap::entity!(UnitOfMeasure {
    code: leaf,
    description: leaf,
});

#[derive(Debug, Default, PartialEq)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
}
resultmap::entity!(Address {
    street: leaf,
    city: leaf,
});

#[derive(Debug, Default, PartialEq)]
pub struct Customer {
    pub name: Option<String>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
}
resultmap::entity!(Customer {
    name: leaf,
    billing_address: nested,
    shipping_address: nested,
});

#[derive(Debug, Default, PartialEq)]
pub struct SalesOrder {
    pub order_no: i64,
    pub ordered_at: Option<NaiveDateTime>,
    pub customer: Option<Customer>,
    pub replaces: Option<Box<SalesOrder>>,
}
resultmap::entity!(SalesOrder {
    order_no: leaf,
    ordered_at: leaf,
    customer: nested,
    replaces: ignore,
});
