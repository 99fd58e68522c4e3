use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::value_objects::{Address, OrderId, OrderStatus};

// ============================================================================
// Order Read Model - Client-facing views
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeader {
    pub order_id: OrderId,
    pub member_name: String,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub address: Address,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub item_name: String,
    pub unit_price: i32,
    pub count: i32,
}

/// One order aggregate: the header plus its items in fetch order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub header: OrderHeader,
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    pub fn new(header: OrderHeader, items: Vec<OrderItemView>) -> Self {
        Self { header, items }
    }

    pub fn order_id(&self) -> OrderId {
        self.header.order_id
    }

    /// Expand back into one flat row per item. An order without items
    /// still yields one row, with no item part.
    pub fn flatten(&self) -> Vec<FlatRow> {
        if self.items.is_empty() {
            return vec![FlatRow::new(&self.header, None)];
        }
        self.items
            .iter()
            .map(|item| FlatRow::new(&self.header, Some(item.clone())))
            .collect()
    }
}

/// One row of the wide order/item outer join. Header fields repeat for
/// every item of the same order; an order with no lines comes back as a
/// single row whose `item` is `None`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlatRow {
    pub order_id: OrderId,
    pub member_name: String,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub address: Address,
    #[serde(flatten)]
    pub item: Option<OrderItemView>,
}

impl FlatRow {
    pub fn new(header: &OrderHeader, item: Option<OrderItemView>) -> Self {
        Self {
            order_id: header.order_id,
            member_name: header.member_name.clone(),
            order_date: header.order_date,
            status: header.status,
            address: header.address.clone(),
            item,
        }
    }

    pub fn header(&self) -> OrderHeader {
        OrderHeader {
            order_id: self.order_id,
            member_name: self.member_name.clone(),
            order_date: self.order_date,
            status: self.status,
            address: self.address.clone(),
        }
    }
}

/// Item projection row keyed by its owning order, used to regroup
/// batched item loads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectedItem {
    pub order_id: OrderId,
    pub item: OrderItemView,
}

/// Top-level response wrapper, keeps the payload root an object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResponseEnvelope<T> {
    pub data: T,
}

impl<T> ResponseEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
