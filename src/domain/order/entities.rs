use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::value_objects::{Address, DeliveryStatus, ItemKind, OrderId, OrderStatus};
use super::views::{OrderHeader, OrderItemView};

// ============================================================================
// Order Entities - Normalized store shapes
// ============================================================================
//
// These mirror the relational tables one-to-one. They are only ever read
// by this crate; placement, cancellation and stock changes happen elsewhere.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub address: Address,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Delivery {
    pub id: i64,
    pub address: Address,
    pub status: DeliveryStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: i32,
    pub stock_quantity: i32,
    pub kind: ItemKind,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub member_id: i64,
    pub delivery_id: i64,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
}

/// One `order_item` row: the price is captured at order time and may
/// differ from the item's current list price.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub item_id: i64,
    pub order_price: i32,
    pub count: i32,
}

/// An order with its to-one relations resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRecord {
    pub order: Order,
    pub member: Member,
    pub delivery: Delivery,
}

impl OrderRecord {
    pub fn id(&self) -> OrderId {
        self.order.id
    }

    pub fn header(&self) -> OrderHeader {
        OrderHeader {
            order_id: self.order.id,
            member_name: self.member.name.clone(),
            order_date: self.order.order_date,
            status: self.order.status,
            address: self.delivery.address.clone(),
        }
    }
}

/// An order line with its item resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLineRecord {
    pub line: OrderLine,
    pub item: Item,
}

impl OrderLineRecord {
    pub fn order_id(&self) -> OrderId {
        self.line.order_id
    }

    pub fn view(&self) -> OrderItemView {
        OrderItemView {
            item_name: self.item.name.clone(),
            unit_price: self.line.order_price,
            count: self.line.count,
        }
    }
}
