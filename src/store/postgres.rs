use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;

use super::{OrderSnapshot, OrderStore, Page, StoreError};
use crate::domain::order::{
    Address, Delivery, FlatRow, Item, ItemColumns, ItemKind, Member, Order, OrderHeader,
    OrderId, OrderItemView, OrderLine, OrderLineRecord, OrderRecord, ProjectedItem,
};

// ============================================================================
// PostgreSQL Order Store
// ============================================================================
//
// Every snapshot is one REPEATABLE READ, READ ONLY transaction, so all the
// statements a strategy issues see the same data. Dropping the snapshot
// (timeout, error) drops the transaction, which rolls it back.
//
// The two wide joins outer-join the lines, so an order without lines still
// produces one row with NULL line and item columns.
//
// LIMIT/OFFSET are bound as nullable: LIMIT NULL is LIMIT ALL and
// OFFSET NULL is OFFSET 0, so paged and unpaged reads share one statement.
//
// ============================================================================

const EAGER_JOIN_SQL: &str = "
    SELECT o.order_id, o.order_date, o.status,
           m.member_id, m.name AS member_name,
           m.city AS member_city, m.street AS member_street, m.zipcode AS member_zipcode,
           d.delivery_id, d.status AS delivery_status,
           d.city AS delivery_city, d.street AS delivery_street, d.zipcode AS delivery_zipcode,
           oi.order_item_id, oi.order_id AS line_order_id, oi.order_price, oi.count,
           i.item_id, i.dtype, i.name AS item_name, i.price AS item_price, i.stock_quantity,
           i.author, i.isbn, i.artist, i.etc, i.director, i.actor
    FROM orders o
    JOIN member m ON m.member_id = o.member_id
    JOIN delivery d ON d.delivery_id = o.delivery_id
    LEFT JOIN (order_item oi JOIN item i ON i.item_id = oi.item_id)
           ON oi.order_id = o.order_id
    ORDER BY o.order_id, oi.order_item_id";

const TO_ONE_JOIN_SQL: &str = "
    SELECT o.order_id, o.order_date, o.status,
           m.member_id, m.name AS member_name,
           m.city AS member_city, m.street AS member_street, m.zipcode AS member_zipcode,
           d.delivery_id, d.status AS delivery_status,
           d.city AS delivery_city, d.street AS delivery_street, d.zipcode AS delivery_zipcode
    FROM orders o
    JOIN member m ON m.member_id = o.member_id
    JOIN delivery d ON d.delivery_id = o.delivery_id
    ORDER BY o.order_id
    LIMIT $1 OFFSET $2";

const ORDER_LINES_SQL: &str = "
    SELECT oi.order_item_id, oi.order_id AS line_order_id, oi.order_price, oi.count,
           i.item_id, i.dtype, i.name AS item_name, i.price AS item_price, i.stock_quantity,
           i.author, i.isbn, i.artist, i.etc, i.director, i.actor
    FROM order_item oi
    JOIN item i ON i.item_id = oi.item_id
    WHERE oi.order_id = ANY($1)
    ORDER BY oi.order_item_id";

const HEADER_PROJECTION_SQL: &str = "
    SELECT o.order_id, m.name AS member_name, o.order_date, o.status,
           d.city, d.street, d.zipcode
    FROM orders o
    JOIN member m ON m.member_id = o.member_id
    JOIN delivery d ON d.delivery_id = o.delivery_id
    ORDER BY o.order_id
    LIMIT $1 OFFSET $2";

const ITEM_PROJECTION_SQL: &str = "
    SELECT oi.order_id, i.name AS item_name, oi.order_price, oi.count
    FROM order_item oi
    JOIN item i ON i.item_id = oi.item_id
    WHERE oi.order_id = ANY($1)
    ORDER BY oi.order_item_id";

const FLAT_JOIN_SQL: &str = "
    SELECT o.order_id, m.name AS member_name, o.order_date, o.status,
           d.city, d.street, d.zipcode,
           i.name AS item_name, oi.order_price, oi.count
    FROM orders o
    JOIN member m ON m.member_id = o.member_id
    JOIN delivery d ON d.delivery_id = o.delivery_id
    LEFT JOIN (order_item oi JOIN item i ON i.item_id = oi.item_id)
           ON oi.order_id = o.order_id
    ORDER BY oi.order_item_id, o.order_id";

/// Transport-level failures surface as `Connection`, everything else
/// (bad SQL, decode errors) as `Query`.
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connection(error.to_string()),
        _ => StoreError::Query(error.to_string()),
    }
}

fn page_binds(page: Option<Page>) -> (Option<i64>, Option<i64>) {
    match page {
        Some(page) => (Some(page.limit()), Some(page.offset())),
        None => (None, None),
    }
}

fn id_binds(order_ids: &[OrderId]) -> Vec<i64> {
    order_ids.iter().map(|id| id.get()).collect()
}

// ============================================================================
// Row shapes
// ============================================================================

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_id: i64,
    order_date: NaiveDateTime,
    status: String,
    member_id: i64,
    member_name: String,
    member_city: Option<String>,
    member_street: Option<String>,
    member_zipcode: Option<String>,
    delivery_id: i64,
    delivery_status: String,
    delivery_city: Option<String>,
    delivery_street: Option<String>,
    delivery_zipcode: Option<String>,
}

impl TryFrom<OrderRow> for OrderRecord {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(OrderRecord {
            order: Order {
                id: OrderId(row.order_id),
                member_id: row.member_id,
                delivery_id: row.delivery_id,
                order_date: row.order_date,
                status: row.status.parse().map_err(StoreError::Query)?,
            },
            member: Member {
                id: row.member_id,
                name: row.member_name,
                address: address(row.member_city, row.member_street, row.member_zipcode),
            },
            delivery: Delivery {
                id: row.delivery_id,
                address: address(row.delivery_city, row.delivery_street, row.delivery_zipcode),
                status: row.delivery_status.parse().map_err(StoreError::Query)?,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct LineRow {
    order_item_id: i64,
    line_order_id: i64,
    order_price: i32,
    count: i32,
    item_id: i64,
    dtype: String,
    item_name: String,
    item_price: i32,
    stock_quantity: i32,
    author: Option<String>,
    isbn: Option<String>,
    artist: Option<String>,
    etc: Option<String>,
    director: Option<String>,
    actor: Option<String>,
}

impl TryFrom<LineRow> for OrderLineRecord {
    type Error = StoreError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let columns = ItemColumns {
            author: row.author,
            isbn: row.isbn,
            artist: row.artist,
            etc: row.etc,
            director: row.director,
            actor: row.actor,
        };
        let kind = ItemKind::from_columns(&row.dtype, columns).map_err(StoreError::Query)?;

        Ok(OrderLineRecord {
            line: OrderLine {
                id: row.order_item_id,
                order_id: OrderId(row.line_order_id),
                item_id: row.item_id,
                order_price: row.order_price,
                count: row.count,
            },
            item: Item {
                id: row.item_id,
                name: row.item_name,
                price: row.item_price,
                stock_quantity: row.stock_quantity,
                kind,
            },
        })
    }
}

/// Line and item columns of the outer join, all NULL for an order
/// without lines.
#[derive(sqlx::FromRow)]
struct OuterLineRow {
    order_item_id: Option<i64>,
    line_order_id: Option<i64>,
    order_price: Option<i32>,
    count: Option<i32>,
    item_id: Option<i64>,
    dtype: Option<String>,
    item_name: Option<String>,
    item_price: Option<i32>,
    stock_quantity: Option<i32>,
    author: Option<String>,
    isbn: Option<String>,
    artist: Option<String>,
    etc: Option<String>,
    director: Option<String>,
    actor: Option<String>,
}

impl OuterLineRow {
    fn into_line(self) -> Option<LineRow> {
        Some(LineRow {
            order_item_id: self.order_item_id?,
            line_order_id: self.line_order_id?,
            order_price: self.order_price?,
            count: self.count?,
            item_id: self.item_id?,
            dtype: self.dtype?,
            item_name: self.item_name?,
            item_price: self.item_price?,
            stock_quantity: self.stock_quantity?,
            author: self.author,
            isbn: self.isbn,
            artist: self.artist,
            etc: self.etc,
            director: self.director,
            actor: self.actor,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EagerRow {
    #[sqlx(flatten)]
    order: OrderRow,
    #[sqlx(flatten)]
    line: OuterLineRow,
}

#[derive(sqlx::FromRow)]
struct HeaderRow {
    order_id: i64,
    member_name: String,
    order_date: NaiveDateTime,
    status: String,
    city: Option<String>,
    street: Option<String>,
    zipcode: Option<String>,
}

impl TryFrom<HeaderRow> for OrderHeader {
    type Error = StoreError;

    fn try_from(row: HeaderRow) -> Result<Self, Self::Error> {
        Ok(OrderHeader {
            order_id: OrderId(row.order_id),
            member_name: row.member_name,
            order_date: row.order_date,
            status: row.status.parse().map_err(StoreError::Query)?,
            address: address(row.city, row.street, row.zipcode),
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    order_id: i64,
    item_name: String,
    order_price: i32,
    count: i32,
}

impl From<ItemRow> for ProjectedItem {
    fn from(row: ItemRow) -> Self {
        ProjectedItem {
            order_id: OrderId(row.order_id),
            item: OrderItemView {
                item_name: row.item_name,
                unit_price: row.order_price,
                count: row.count,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct FlatJoinRow {
    #[sqlx(flatten)]
    header: HeaderRow,
    item_name: Option<String>,
    order_price: Option<i32>,
    count: Option<i32>,
}

impl TryFrom<FlatJoinRow> for FlatRow {
    type Error = StoreError;

    fn try_from(row: FlatJoinRow) -> Result<Self, Self::Error> {
        let header = OrderHeader::try_from(row.header)?;
        let item = match (row.item_name, row.order_price, row.count) {
            (Some(item_name), Some(unit_price), Some(count)) => Some(OrderItemView {
                item_name,
                unit_price,
                count,
            }),
            _ => None,
        };
        Ok(FlatRow::new(&header, item))
    }
}

fn address(city: Option<String>, street: Option<String>, zip: Option<String>) -> Address {
    Address {
        city: city.unwrap_or_default(),
        street: street.unwrap_or_default(),
        zip: zip.unwrap_or_default(),
    }
}

// ============================================================================
// Store + Snapshot
// ============================================================================

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;

        tracing::info!(max_connections, "Connected to order store");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn snapshot(&self) -> Result<Box<dyn OrderSnapshot>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Box::new(PgSnapshot { tx: Some(tx) }))
    }
}

struct PgSnapshot {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSnapshot {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| StoreError::Query("snapshot already released".to_string()))
    }
}

#[async_trait]
impl OrderSnapshot for PgSnapshot {
    async fn eager_join(&mut self) -> Result<Vec<(OrderRecord, Option<OrderLineRecord>)>, StoreError> {
        let rows = sqlx::query_as::<_, EagerRow>(EAGER_JOIN_SQL)
            .fetch_all(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(rows = rows.len(), "eager join fetched");
        rows.into_iter()
            .map(|row| -> Result<_, StoreError> {
                let line = row.line.into_line().map(OrderLineRecord::try_from).transpose()?;
                Ok((OrderRecord::try_from(row.order)?, line))
            })
            .collect()
    }

    async fn to_one_join(&mut self, page: Option<Page>) -> Result<Vec<OrderRecord>, StoreError> {
        let (limit, offset) = page_binds(page);
        let rows = sqlx::query_as::<_, OrderRow>(TO_ONE_JOIN_SQL)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(rows = rows.len(), ?page, "to-one join fetched");
        rows.into_iter().map(OrderRecord::try_from).collect()
    }

    async fn order_lines(&mut self, order_ids: &[OrderId]) -> Result<Vec<OrderLineRecord>, StoreError> {
        let rows = sqlx::query_as::<_, LineRow>(ORDER_LINES_SQL)
            .bind(id_binds(order_ids))
            .fetch_all(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(orders = order_ids.len(), rows = rows.len(), "order lines fetched");
        rows.into_iter().map(OrderLineRecord::try_from).collect()
    }

    async fn header_projection(&mut self, page: Option<Page>) -> Result<Vec<OrderHeader>, StoreError> {
        let (limit, offset) = page_binds(page);
        let rows = sqlx::query_as::<_, HeaderRow>(HEADER_PROJECTION_SQL)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(rows = rows.len(), ?page, "header projection fetched");
        rows.into_iter().map(OrderHeader::try_from).collect()
    }

    async fn item_projection(&mut self, order_ids: &[OrderId]) -> Result<Vec<ProjectedItem>, StoreError> {
        let rows = sqlx::query_as::<_, ItemRow>(ITEM_PROJECTION_SQL)
            .bind(id_binds(order_ids))
            .fetch_all(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(orders = order_ids.len(), rows = rows.len(), "item projection fetched");
        Ok(rows.into_iter().map(ProjectedItem::from).collect())
    }

    async fn flat_join(&mut self) -> Result<Vec<FlatRow>, StoreError> {
        let rows = sqlx::query_as::<_, FlatJoinRow>(FLAT_JOIN_SQL)
            .fetch_all(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(rows = rows.len(), "flat join fetched");
        rows.into_iter().map(FlatRow::try_from).collect()
    }

    async fn release(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_err(map_sqlx_error),
            None => Ok(()),
        }
    }
}
