use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use super::{OrderSnapshot, OrderStore, Page, StoreError};
use crate::domain::order::{
    Address, Delivery, DeliveryStatus, FlatRow, Item, ItemKind, Member, Order, OrderHeader,
    OrderId, OrderLine, OrderLineRecord, OrderRecord, OrderStatus, ProjectedItem,
};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// Holds the five tables in id-ordered maps and answers the same reads as
// the PostgreSQL adapter with the same join semantics (orders outer-joined
// to their lines, orders by id, lines by line id). A snapshot is a clone of the tables taken when
// it is opened, so writes after that point are invisible to it.
//
// Every call is appended to a shared log, which is how tests count round
// trips.
//
// ============================================================================

/// One call into the store, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Snapshot,
    EagerJoin,
    ToOneJoin(Option<Page>),
    OrderLines(Vec<OrderId>),
    HeaderProjection(Option<Page>),
    ItemProjection(Vec<OrderId>),
    FlatJoin,
    Release,
}

impl StoreCall {
    /// Whether this call reads rows (as opposed to opening/closing a scope).
    pub fn is_read(&self) -> bool {
        !matches!(self, StoreCall::Snapshot | StoreCall::Release)
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    members: BTreeMap<i64, Member>,
    deliveries: BTreeMap<i64, Delivery>,
    items: BTreeMap<i64, Item>,
    orders: BTreeMap<OrderId, Order>,
    lines: BTreeMap<i64, OrderLine>,
}

impl Tables {
    fn record(&self, order: &Order) -> Option<OrderRecord> {
        let member = self.members.get(&order.member_id)?;
        let delivery = self.deliveries.get(&order.delivery_id)?;
        Some(OrderRecord {
            order: order.clone(),
            member: member.clone(),
            delivery: delivery.clone(),
        })
    }

    fn records(&self) -> Vec<OrderRecord> {
        self.orders.values().filter_map(|order| self.record(order)).collect()
    }

    fn line_record(&self, line: &OrderLine) -> Option<OrderLineRecord> {
        let item = self.items.get(&line.item_id)?;
        Some(OrderLineRecord {
            line: line.clone(),
            item: item.clone(),
        })
    }

    fn line_records(&self, order_ids: &[OrderId]) -> Vec<OrderLineRecord> {
        self.lines
            .values()
            .filter(|line| order_ids.contains(&line.order_id))
            .filter_map(|line| self.line_record(line))
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    failure: Arc<Mutex<Option<StoreError>>>,
    latency: Option<Duration>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, to exercise timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every subsequent call fail with `error` until cleared.
    pub fn fail_with(&self, error: Option<StoreError>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = error;
    }

    pub fn insert_member(&self, member: Member) {
        self.write(|tables| {
            tables.members.insert(member.id, member);
        });
    }

    pub fn insert_delivery(&self, delivery: Delivery) {
        self.write(|tables| {
            tables.deliveries.insert(delivery.id, delivery);
        });
    }

    pub fn insert_item(&self, item: Item) {
        self.write(|tables| {
            tables.items.insert(item.id, item);
        });
    }

    pub fn insert_order(&self, order: Order) {
        self.write(|tables| {
            tables.orders.insert(order.id, order);
        });
    }

    pub fn insert_line(&self, line: OrderLine) {
        self.write(|tables| {
            tables.lines.insert(line.id, line);
        });
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Row-reading calls recorded so far.
    pub fn read_calls(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_read).collect()
    }

    fn write(&self, apply: impl FnOnce(&mut Tables)) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut tables);
    }

    /// A small seeded store: two members, each with one order of two books.
    pub fn demo() -> Self {
        let store = Self::new();
        let order_date = NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .unwrap_or_default();

        let seed = [
            (1, "userA", Address::new("Seoul", "1", "1111"), [("JPA1 BOOK", 10000, 1), ("JPA2 BOOK", 20000, 2)]),
            (2, "userB", Address::new("Jinju", "2", "2222"), [("SPRING1 BOOK", 20000, 3), ("SPRING2 BOOK", 40000, 4)]),
        ];

        let mut next_item = 1;
        for (id, name, address, books) in seed {
            store.insert_member(Member {
                id,
                name: name.to_string(),
                address: address.clone(),
            });
            store.insert_delivery(Delivery {
                id,
                address,
                status: DeliveryStatus::Ready,
            });
            store.insert_order(Order {
                id: OrderId(id),
                member_id: id,
                delivery_id: id,
                order_date,
                status: OrderStatus::Placed,
            });

            for (name, price, count) in books {
                store.insert_item(Item {
                    id: next_item,
                    name: name.to_string(),
                    price,
                    stock_quantity: 100 - count,
                    kind: ItemKind::Book {
                        author: None,
                        isbn: None,
                    },
                });
                store.insert_line(OrderLine {
                    id: next_item,
                    order_id: OrderId(id),
                    item_id: next_item,
                    order_price: price,
                    count,
                });
                next_item += 1;
            }
        }

        store
    }

    fn record_call(calls: &Mutex<Vec<StoreCall>>, call: StoreCall) {
        calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    fn current_failure(&self) -> Option<StoreError> {
        self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn snapshot(&self) -> Result<Box<dyn OrderSnapshot>, StoreError> {
        Self::record_call(&self.calls, StoreCall::Snapshot);
        if let Some(error) = self.current_failure() {
            return Err(error);
        }

        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(Box::new(MemorySnapshot {
            tables,
            store: self.clone(),
        }))
    }
}

struct MemorySnapshot {
    tables: Tables,
    store: InMemoryOrderStore,
}

impl MemorySnapshot {
    async fn call(&self, call: StoreCall) -> Result<(), StoreError> {
        InMemoryOrderStore::record_call(&self.store.calls, call);
        if let Some(latency) = self.store.latency {
            tokio::time::sleep(latency).await;
        }
        match self.store.current_failure() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OrderSnapshot for MemorySnapshot {
    async fn eager_join(&mut self) -> Result<Vec<(OrderRecord, Option<OrderLineRecord>)>, StoreError> {
        self.call(StoreCall::EagerJoin).await?;

        let mut rows = Vec::new();
        for record in self.tables.records() {
            let lines = self.tables.line_records(&[record.id()]);
            if lines.is_empty() {
                rows.push((record, None));
                continue;
            }
            for line in lines {
                rows.push((record.clone(), Some(line)));
            }
        }
        Ok(rows)
    }

    async fn to_one_join(&mut self, page: Option<Page>) -> Result<Vec<OrderRecord>, StoreError> {
        self.call(StoreCall::ToOneJoin(page)).await?;

        let records = self.tables.records();
        Ok(match page {
            Some(page) => page.slice(records),
            None => records,
        })
    }

    async fn order_lines(&mut self, order_ids: &[OrderId]) -> Result<Vec<OrderLineRecord>, StoreError> {
        self.call(StoreCall::OrderLines(order_ids.to_vec())).await?;
        Ok(self.tables.line_records(order_ids))
    }

    async fn header_projection(&mut self, page: Option<Page>) -> Result<Vec<OrderHeader>, StoreError> {
        self.call(StoreCall::HeaderProjection(page)).await?;

        let headers: Vec<OrderHeader> = self.tables.records().iter().map(OrderRecord::header).collect();
        Ok(match page {
            Some(page) => page.slice(headers),
            None => headers,
        })
    }

    async fn item_projection(&mut self, order_ids: &[OrderId]) -> Result<Vec<ProjectedItem>, StoreError> {
        self.call(StoreCall::ItemProjection(order_ids.to_vec())).await?;

        Ok(self
            .tables
            .line_records(order_ids)
            .iter()
            .map(|record| ProjectedItem {
                order_id: record.order_id(),
                item: record.view(),
            })
            .collect())
    }

    async fn flat_join(&mut self) -> Result<Vec<FlatRow>, StoreError> {
        self.call(StoreCall::FlatJoin).await?;

        let headers: BTreeMap<OrderId, OrderHeader> = self
            .tables
            .records()
            .iter()
            .map(|record| (record.id(), record.header()))
            .collect();

        let mut with_lines = BTreeSet::new();
        let mut rows: Vec<FlatRow> = self
            .tables
            .lines
            .values()
            .filter_map(|line| {
                let header = headers.get(&line.order_id)?;
                let record = self.tables.line_record(line)?;
                with_lines.insert(line.order_id);
                Some(FlatRow::new(header, Some(record.view())))
            })
            .collect();

        // unmatched orders sort last, as NULL line ids do
        rows.extend(
            headers
                .values()
                .filter(|header| !with_lines.contains(&header.order_id))
                .map(|header| FlatRow::new(header, None)),
        );
        Ok(rows)
    }

    async fn release(&mut self) -> Result<(), StoreError> {
        InMemoryOrderStore::record_call(&self.store.calls, StoreCall::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_store_flat_join_has_one_row_per_line() {
        let store = InMemoryOrderStore::demo();
        let mut snapshot = store.snapshot().await.unwrap();

        let rows = snapshot.flat_join().await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].member_name, "userA");
        assert_eq!(rows[3].item.as_ref().unwrap().item_name, "SPRING2 BOOK");
    }

    #[tokio::test]
    async fn test_joins_keep_orders_without_lines() {
        let store = InMemoryOrderStore::demo();
        store.insert_order(Order {
            id: OrderId(3),
            member_id: 2,
            delivery_id: 2,
            order_date: NaiveDate::from_ymd_opt(2024, 1, 20)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            status: OrderStatus::Placed,
        });
        let mut snapshot = store.snapshot().await.unwrap();

        let rows = snapshot.flat_join().await.unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4].order_id, OrderId(3));
        assert_eq!(rows[4].item, None);

        let eager = snapshot.eager_join().await.unwrap();
        assert_eq!(eager.len(), 5);
        let (record, line) = &eager[4];
        assert_eq!(record.id(), OrderId(3));
        assert!(line.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_does_not_see_later_writes() {
        let store = InMemoryOrderStore::demo();
        let mut snapshot = store.snapshot().await.unwrap();

        store.insert_line(OrderLine {
            id: 99,
            order_id: OrderId(1),
            item_id: 1,
            order_price: 1,
            count: 1,
        });

        let lines = snapshot.order_lines(&[OrderId(1)]).await.unwrap();
        assert_eq!(lines.len(), 2);

        let mut fresh = store.snapshot().await.unwrap();
        assert_eq!(fresh.order_lines(&[OrderId(1)]).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_to_one_join_skips_orders_without_member() {
        let store = InMemoryOrderStore::demo();
        store.insert_order(Order {
            id: OrderId(3),
            member_id: 404,
            delivery_id: 1,
            order_date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            status: OrderStatus::Placed,
        });

        let mut snapshot = store.snapshot().await.unwrap();
        let records = snapshot.to_one_join(None).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_calls_are_logged_in_order() {
        let store = InMemoryOrderStore::demo();
        let mut snapshot = store.snapshot().await.unwrap();
        snapshot.header_projection(None).await.unwrap();
        snapshot.item_projection(&[OrderId(1), OrderId(2)]).await.unwrap();
        snapshot.release().await.unwrap();

        assert_eq!(
            store.calls(),
            vec![
                StoreCall::Snapshot,
                StoreCall::HeaderProjection(None),
                StoreCall::ItemProjection(vec![OrderId(1), OrderId(2)]),
                StoreCall::Release,
            ]
        );
        assert_eq!(store.read_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_surfaces_from_snapshot() {
        let store = InMemoryOrderStore::demo();
        store.fail_with(Some(StoreError::Connection("refused".to_string())));

        let result = store.snapshot().await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
