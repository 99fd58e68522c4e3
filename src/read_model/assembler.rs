use std::collections::HashMap;

use super::errors::QueryError;
use crate::domain::order::{FlatRow, OrderHeader, OrderId, OrderView};

// ============================================================================
// Result Assembler - flat rows -> nested order aggregates
// ============================================================================
//
// 1. Group rows by scalar order id, in first-seen order.
// 2. Every row after the first in a group must repeat the group's header
//    exactly; a mismatch means the join (or the data) is broken.
// 3. Items are appended in row order. A row without an item (an order
//    with no lines) opens its group and contributes nothing else.
// 4. Output is sorted by order id ascending.
//
// ============================================================================

pub fn assemble<I>(rows: I) -> Result<Vec<OrderView>, QueryError>
where
    I: IntoIterator<Item = FlatRow>,
{
    let mut index: HashMap<OrderId, usize> = HashMap::new();
    let mut groups: Vec<OrderView> = Vec::new();

    for row in rows {
        match index.get(&row.order_id) {
            Some(&slot) => {
                let group = &mut groups[slot];
                check_header(&group.header, &row)?;
                group.items.extend(row.item);
            }
            None => {
                index.insert(row.order_id, groups.len());
                let header = row.header();
                groups.push(OrderView::new(header, row.item.into_iter().collect()));
            }
        }
    }

    // stable sort: item order inside each group is untouched
    groups.sort_by_key(OrderView::order_id);
    Ok(groups)
}

/// Inverse of [`assemble`]: one row per item (or one item-less row for an
/// empty order), in view then item order.
pub fn flatten(views: &[OrderView]) -> Vec<FlatRow> {
    views.iter().flat_map(OrderView::flatten).collect()
}

fn check_header(header: &OrderHeader, row: &FlatRow) -> Result<(), QueryError> {
    let field = if header.member_name != row.member_name {
        "memberName"
    } else if header.order_date != row.order_date {
        "orderDate"
    } else if header.status != row.status {
        "status"
    } else if header.address != row.address {
        "address"
    } else {
        return Ok(());
    };

    tracing::error!(
        order_id = %header.order_id,
        field,
        "Flat rows disagree on header fields"
    );
    Err(QueryError::AggregationInconsistency {
        order_id: header.order_id,
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Address, OrderItemView, OrderStatus};
    use chrono::NaiveDate;

    fn bare_row(order_id: i64, member: &str) -> FlatRow {
        FlatRow {
            order_id: OrderId(order_id),
            member_name: member.to_string(),
            order_date: NaiveDate::from_ymd_opt(2024, 2, order_id as u32)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            status: OrderStatus::Placed,
            address: Address::new("Seoul", "Gangnam", "06000"),
            item: None,
        }
    }

    fn row(order_id: i64, member: &str, item: &str, price: i32, count: i32) -> FlatRow {
        FlatRow {
            item: Some(OrderItemView {
                item_name: item.to_string(),
                unit_price: price,
                count,
            }),
            ..bare_row(order_id, member)
        }
    }

    fn item_name(row: &FlatRow) -> Option<&str> {
        row.item.as_ref().map(|item| item.item_name.as_str())
    }

    fn tuples(rows: &[FlatRow]) -> Vec<(OrderId, Option<OrderItemView>)> {
        let mut tuples: Vec<_> = rows.iter().map(|r| (r.order_id, r.item.clone())).collect();
        tuples.sort();
        tuples
    }

    fn scenario_rows() -> Vec<FlatRow> {
        vec![
            row(2, "B", "Pen", 500, 1),
            row(1, "A", "Book", 1000, 2),
            row(2, "B", "Pen", 500, 3),
        ]
    }

    #[test]
    fn test_groups_two_orders_sorted_by_id() {
        let views = assemble(scenario_rows()).unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].order_id(), OrderId(1));
        assert_eq!(
            views[0].items,
            vec![OrderItemView {
                item_name: "Book".to_string(),
                unit_price: 1000,
                count: 2,
            }]
        );

        assert_eq!(views[1].order_id(), OrderId(2));
        assert_eq!(views[1].items.len(), 2);
        assert_eq!(views[1].items[0].count, 1);
        assert_eq!(views[1].items[1].count, 3);
    }

    #[test]
    fn test_inconsistent_member_name_is_rejected() {
        let rows = vec![row(7, "kim", "Book", 1000, 1), row(7, "lee", "Book", 1000, 1)];

        let err = assemble(rows).unwrap_err();
        assert_eq!(
            err,
            QueryError::AggregationInconsistency {
                order_id: OrderId(7),
                field: "memberName",
            }
        );
    }

    #[test]
    fn test_inconsistent_address_is_rejected() {
        let mut second = row(3, "kim", "Pen", 10, 1);
        second.address.zip = "99999".to_string();

        let err = assemble(vec![row(3, "kim", "Book", 10, 1), second]).unwrap_err();
        assert!(matches!(err, QueryError::AggregationInconsistency { field: "address", .. }));
    }

    #[test]
    fn test_round_trip_preserves_row_multiset() {
        let rows = vec![
            row(5, "e", "Album", 3000, 1),
            row(3, "c", "Movie", 2000, 2),
            row(5, "e", "Album", 3000, 1),
            row(1, "a", "Book", 1000, 4),
            row(3, "c", "Book", 1000, 1),
        ];

        let views = assemble(rows.clone()).unwrap();
        assert_eq!(tuples(&flatten(&views)), tuples(&rows));
    }

    #[test]
    fn test_shuffled_input_yields_same_views() {
        let rows = vec![
            row(4, "d", "Book", 1000, 1),
            row(2, "b", "Pen", 500, 1),
            row(9, "i", "Movie", 2000, 1),
            row(2, "b", "Ink", 300, 2),
        ];
        let expected = assemble(rows.clone()).unwrap();

        for shift in 1..rows.len() {
            let mut rotated = rows.clone();
            rotated.rotate_left(shift);
            // keep per-order relative order so item sequences must match
            let pen_first = rotated
                .iter()
                .position(|r| item_name(r) == Some("Pen"))
                .unwrap()
                < rotated.iter().position(|r| item_name(r) == Some("Ink")).unwrap();
            let views = assemble(rotated).unwrap();

            let ids: Vec<OrderId> = views.iter().map(OrderView::order_id).collect();
            assert_eq!(ids, vec![OrderId(2), OrderId(4), OrderId(9)]);
            if pen_first {
                assert_eq!(views, expected);
            } else {
                assert_eq!(views[1..], expected[1..]);
                assert_eq!(views[0].items[0].item_name, "Ink");
            }
        }
    }

    #[test]
    fn test_order_without_lines_gets_empty_items() {
        let rows = vec![row(2, "b", "Pen", 500, 1), bare_row(1, "a")];

        let views = assemble(rows.clone()).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].order_id(), OrderId(1));
        assert!(views[0].items.is_empty());
        assert_eq!(views[1].items.len(), 1);

        assert_eq!(tuples(&flatten(&views)), tuples(&rows));
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        assert!(assemble(Vec::new()).unwrap().is_empty());
    }
}
