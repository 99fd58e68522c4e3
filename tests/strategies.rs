//! End-to-end coverage of the six fetch strategies over the in-memory store.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::NaiveDate;
use rstest::{fixture, rstest};

use order_read_model::domain::order::{
    Address, Delivery, DeliveryStatus, Item, ItemKind, Member, Order, OrderId, OrderLine,
    OrderStatus, OrderView,
};
use order_read_model::store::InMemoryOrderStore;
use order_read_model::{Pagination, QueryConfig, QueryError, QueryService, Strategy};

/// Seeds one member/delivery per order and one item per line.
struct StoreBuilder {
    store: InMemoryOrderStore,
    next_line: i64,
}

impl StoreBuilder {
    fn new() -> Self {
        Self {
            store: InMemoryOrderStore::new(),
            next_line: 1,
        }
    }

    fn order(mut self, id: i64, member: &str, lines: &[(&str, i32, i32)]) -> Self {
        let address = Address::new(format!("city-{id}"), format!("street-{id}"), format!("{id:05}"));
        self.store.insert_member(Member {
            id,
            name: member.to_string(),
            address: address.clone(),
        });
        self.store.insert_delivery(Delivery {
            id,
            address,
            status: DeliveryStatus::Ready,
        });
        self.store.insert_order(Order {
            id: OrderId(id),
            member_id: id,
            delivery_id: id,
            order_date: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(8, id as u32, 0)
                .unwrap(),
            status: if id % 2 == 0 {
                OrderStatus::Cancelled
            } else {
                OrderStatus::Placed
            },
        });

        for (name, price, count) in lines {
            let line_id = self.next_line;
            self.next_line += 1;
            self.store.insert_item(Item {
                id: line_id,
                name: name.to_string(),
                price: *price,
                stock_quantity: 10,
                kind: ItemKind::Album {
                    artist: None,
                    etc: None,
                },
            });
            self.store.insert_line(OrderLine {
                id: line_id,
                order_id: OrderId(id),
                item_id: line_id,
                order_price: *price,
                count: *count,
            });
        }
        self
    }

    fn build(self) -> InMemoryOrderStore {
        self.store
    }
}

#[fixture]
fn five_orders() -> InMemoryOrderStore {
    StoreBuilder::new()
        .order(1, "kim", &[("Book", 1000, 2)])
        .order(2, "lee", &[("Pen", 500, 1), ("Pen", 500, 3)])
        .order(3, "park", &[("Album", 15000, 1), ("Movie", 9000, 1), ("Book", 1000, 1)])
        .order(4, "choi", &[("Ink", 300, 10)])
        .order(5, "jung", &[("Book", 2000, 1), ("Pen", 700, 2)])
        .build()
}

fn service(store: &InMemoryOrderStore, batch_size: usize) -> QueryService {
    QueryService::new(
        Arc::new(store.clone()),
        QueryConfig::new(batch_size, None).unwrap(),
    )
}

/// orderId -> sorted item multiset
fn content(views: &[OrderView]) -> BTreeMap<OrderId, Vec<(String, i32, i32)>> {
    views
        .iter()
        .map(|view| {
            let mut items: Vec<_> = view
                .items
                .iter()
                .map(|item| (item.item_name.clone(), item.unit_price, item.count))
                .collect();
            items.sort();
            (view.order_id(), items)
        })
        .collect()
}

#[rstest]
#[tokio::test]
async fn test_all_strategies_return_the_same_aggregates(five_orders: InMemoryOrderStore) {
    let service = service(&five_orders, 2);
    let baseline = service.query(Strategy::FlatJoin, None).await.unwrap();

    for strategy in Strategy::ALL {
        let views = service.query(strategy, None).await.unwrap();
        assert_eq!(content(&views), content(&baseline), "strategy {strategy}");

        let headers: Vec<_> = views.iter().map(|view| view.header.clone()).collect();
        let expected: Vec<_> = baseline.iter().map(|view| view.header.clone()).collect();
        assert_eq!(headers, expected, "strategy {strategy}");
    }
}

/// Orders 2 and 4 were placed with no lines.
#[fixture]
fn with_empty_orders() -> InMemoryOrderStore {
    StoreBuilder::new()
        .order(1, "kim", &[("Book", 1000, 2)])
        .order(2, "lee", &[])
        .order(3, "park", &[("Pen", 500, 1), ("Pen", 500, 3)])
        .order(4, "choi", &[])
        .build()
}

#[rstest]
#[case(Strategy::EagerAll)]
#[case(Strategy::ToOneJoinPerItem)]
#[case(Strategy::ToOneJoinBatched)]
#[case(Strategy::ProjectionPerItem)]
#[case(Strategy::ProjectionBatched)]
#[case(Strategy::FlatJoin)]
#[tokio::test]
async fn test_orders_without_lines_have_empty_items(
    #[case] strategy: Strategy,
    with_empty_orders: InMemoryOrderStore,
) {
    let views = service(&with_empty_orders, 2).query(strategy, None).await.unwrap();

    let ids: Vec<OrderId> = views.iter().map(OrderView::order_id).collect();
    assert_eq!(ids, vec![OrderId(1), OrderId(2), OrderId(3), OrderId(4)]);
    assert!(views[1].items.is_empty());
    assert!(views[3].items.is_empty());
    assert_eq!(views[2].items.len(), 2);
    assert_eq!(views[1].header.member_name, "lee");
}

#[rstest]
#[case(Strategy::EagerAll)]
#[case(Strategy::ToOneJoinPerItem)]
#[case(Strategy::ToOneJoinBatched)]
#[case(Strategy::ProjectionPerItem)]
#[case(Strategy::ProjectionBatched)]
#[case(Strategy::FlatJoin)]
#[tokio::test]
async fn test_round_trips_match_the_strategy_table(#[case] strategy: Strategy, five_orders: InMemoryOrderStore) {
    let batch = NonZeroUsize::new(2).unwrap();
    service(&five_orders, batch.get()).query(strategy, None).await.unwrap();

    assert_eq!(
        five_orders.read_calls().len(),
        strategy.expected_round_trips(5, batch),
        "strategy {strategy}"
    );
}

#[rstest]
#[tokio::test]
async fn test_batched_page_returns_first_two_orders(five_orders: InMemoryOrderStore) {
    let views = service(&five_orders, 100)
        .query(Strategy::ToOneJoinBatched, Some(Pagination::new(0, 2)))
        .await
        .unwrap();

    let ids: Vec<OrderId> = views.iter().map(OrderView::order_id).collect();
    assert_eq!(ids, vec![OrderId(1), OrderId(2)]);
    assert_eq!(views[1].items.len(), 2);
}

#[rstest]
#[case(Strategy::ToOneJoinBatched)]
#[case(Strategy::ProjectionPerItem)]
#[case(Strategy::ProjectionBatched)]
#[tokio::test]
async fn test_page_past_the_end_is_empty(#[case] strategy: Strategy, five_orders: InMemoryOrderStore) {
    let views = service(&five_orders, 100)
        .query(strategy, Some(Pagination::new(5, 2)))
        .await
        .unwrap();

    assert!(views.is_empty());
    // header query only, no item loads for an empty page
    assert_eq!(five_orders.read_calls().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_pages_concatenate_to_the_full_result(five_orders: InMemoryOrderStore) {
    let service = service(&five_orders, 100);
    let full = service.query(Strategy::ProjectionBatched, None).await.unwrap();

    let mut paged = Vec::new();
    for offset in (0..5).step_by(2) {
        let page = service
            .query(Strategy::ProjectionBatched, Some(Pagination::new(offset, 2)))
            .await
            .unwrap();
        paged.extend(page);
    }

    assert_eq!(paged, full);
}

#[rstest]
#[case(Strategy::EagerAll)]
#[case(Strategy::ToOneJoinPerItem)]
#[case(Strategy::FlatJoin)]
#[tokio::test]
async fn test_unpageable_strategies_reject_pagination(#[case] strategy: Strategy, five_orders: InMemoryOrderStore) {
    let err = service(&five_orders, 100)
        .query(strategy, Some(Pagination::new(0, 2)))
        .await
        .unwrap_err();

    assert_eq!(err, QueryError::UnsupportedPagination(strategy));
    assert!(five_orders.calls().is_empty());
}

#[tokio::test]
async fn test_flat_join_groups_the_two_order_scenario() {
    // B is inserted first so its rows come first in the flat join
    let store = StoreBuilder::new()
        .order(2, "B", &[("Pen", 500, 1), ("Pen", 500, 3)])
        .order(1, "A", &[("Book", 1000, 2)])
        .build();

    let views = service(&store, 100).query(Strategy::FlatJoin, None).await.unwrap();

    assert_eq!(views.len(), 2);
    assert_eq!(views[0].order_id(), OrderId(1));
    assert_eq!(views[0].header.member_name, "A");
    assert_eq!(views[0].items.len(), 1);
    assert_eq!(views[0].items[0].item_name, "Book");

    assert_eq!(views[1].order_id(), OrderId(2));
    let counts: Vec<i32> = views[1].items.iter().map(|item| item.count).collect();
    assert_eq!(counts, vec![1, 3]);
    assert_eq!(store.read_calls().len(), 1);
}

#[tokio::test]
async fn test_empty_store_yields_empty_results() {
    let store = InMemoryOrderStore::new();
    let service = service(&store, 10);

    for strategy in Strategy::ALL {
        assert!(service.query(strategy, None).await.unwrap().is_empty());
    }
}
