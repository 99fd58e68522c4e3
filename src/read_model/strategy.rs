use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use super::assembler;
use super::errors::QueryError;
use super::repository::{attach_items, AggregateRepository, ItemSource};
use crate::domain::order::{OrderHeader, OrderId, OrderView};
use crate::store::Page;

// ============================================================================
// Fetch Strategies
// ============================================================================
//
// Six ways to read the same aggregates. They differ only in how many
// store round trips they make and whether they can page; the returned
// views are the same for the same data.
//
//   strategy                 round trips           pages
//   eager-all                1                     no
//   to-one-join-per-item     1 + N                 no
//   to-one-join-batched      1 + ceil(N / batch)   yes
//   projection-per-item      1 + N                 yes
//   projection-batched       1 + ceil(N / batch)   yes
//   flat-join                1                     no
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    EagerAll,
    ToOneJoinPerItem,
    ToOneJoinBatched,
    ProjectionPerItem,
    ProjectionBatched,
    FlatJoin,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::EagerAll,
        Strategy::ToOneJoinPerItem,
        Strategy::ToOneJoinBatched,
        Strategy::ProjectionPerItem,
        Strategy::ProjectionBatched,
        Strategy::FlatJoin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::EagerAll => "eager-all",
            Strategy::ToOneJoinPerItem => "to-one-join-per-item",
            Strategy::ToOneJoinBatched => "to-one-join-batched",
            Strategy::ProjectionPerItem => "projection-per-item",
            Strategy::ProjectionBatched => "projection-batched",
            Strategy::FlatJoin => "flat-join",
        }
    }

    /// Row-multiplying joins cannot be paged: a row cap is not an order cap.
    pub fn supports_pagination(&self) -> bool {
        matches!(
            self,
            Strategy::ToOneJoinBatched | Strategy::ProjectionPerItem | Strategy::ProjectionBatched
        )
    }

    /// Expected store round trips for `orders` headers.
    pub fn expected_round_trips(&self, orders: usize, batch_size: NonZeroUsize) -> usize {
        match self {
            Strategy::EagerAll | Strategy::FlatJoin => 1,
            Strategy::ToOneJoinPerItem | Strategy::ProjectionPerItem => 1 + orders,
            Strategy::ToOneJoinBatched | Strategy::ProjectionBatched => {
                1 + orders.div_ceil(batch_size.get())
            }
        }
    }

    /// Run this strategy against one repository. `page` is only honored by
    /// strategies that support it; the service rejects it for the others.
    pub async fn execute(
        self,
        repo: &mut AggregateRepository<'_>,
        page: Option<Page>,
        batch_size: NonZeroUsize,
    ) -> Result<Vec<OrderView>, QueryError> {
        let views = match self {
            Strategy::EagerAll => repo.fetch_all_eager_join().await?,

            Strategy::ToOneJoinPerItem => {
                let records = repo.fetch_to_one_join_all().await?;
                let headers: Vec<_> = records.iter().map(|record| record.header()).collect();
                let items = repo
                    .batch_load_items(&ids(&headers), NonZeroUsize::MIN, ItemSource::Entity)
                    .await?;
                attach_items(headers, items)
            }

            Strategy::ToOneJoinBatched => {
                let records = match page {
                    Some(page) => repo.fetch_to_one_join_paged(page).await?,
                    None => repo.fetch_to_one_join_all().await?,
                };
                let headers: Vec<_> = records.iter().map(|record| record.header()).collect();
                let items = repo
                    .batch_load_items(&ids(&headers), batch_size, ItemSource::Entity)
                    .await?;
                attach_items(headers, items)
            }

            Strategy::ProjectionPerItem => {
                let headers = repo.fetch_header_projection(page).await?;
                let items = repo
                    .batch_load_items(&ids(&headers), NonZeroUsize::MIN, ItemSource::Projection)
                    .await?;
                attach_items(headers, items)
            }

            Strategy::ProjectionBatched => {
                let headers = repo.fetch_header_projection(page).await?;
                let items = repo
                    .batch_load_items(&ids(&headers), batch_size, ItemSource::Projection)
                    .await?;
                attach_items(headers, items)
            }

            Strategy::FlatJoin => {
                let rows = repo.fetch_flat_join().await?;
                assembler::assemble(rows)?
            }
        };

        Ok(views)
    }
}

fn ids(headers: &[OrderHeader]) -> Vec<OrderId> {
    headers.iter().map(|header| header.order_id).collect()
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Strategy::ALL.iter().map(Strategy::name).collect();
                format!("unknown strategy `{s}` (expected one of: {})", known.join(", "))
            })
    }
}
