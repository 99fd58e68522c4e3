use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Stable numeric identity of an order, as assigned by the store.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl OrderId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    /// Accepts both the long names and the short enum names older rows
    /// were written with (`ORDER`, `CANCEL`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLACED" | "ORDER" => Ok(OrderStatus::Placed),
            "CANCELLED" | "CANCEL" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Ready,
    Comp,
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(DeliveryStatus::Ready),
            "COMP" => Ok(DeliveryStatus::Comp),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub zip: String,
}

impl Address {
    pub fn new(city: impl Into<String>, street: impl Into<String>, zip: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            street: street.into(),
            zip: zip.into(),
        }
    }
}

/// Kind-specific attributes of the single-table item hierarchy.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum ItemKind {
    Book {
        author: Option<String>,
        isbn: Option<String>,
    },
    Album {
        artist: Option<String>,
        etc: Option<String>,
    },
    Movie {
        director: Option<String>,
        actor: Option<String>,
    },
}

/// Nullable per-kind columns of the single `item` table. Only the pair
/// belonging to the row's kind is meaningful.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemColumns {
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub artist: Option<String>,
    pub etc: Option<String>,
    pub director: Option<String>,
    pub actor: Option<String>,
}

impl ItemKind {
    /// Rebuild the kind from the `dtype` discriminator (`B`, `A`, `M`).
    pub fn from_columns(dtype: &str, columns: ItemColumns) -> Result<Self, String> {
        match dtype {
            "B" => Ok(ItemKind::Book {
                author: columns.author,
                isbn: columns.isbn,
            }),
            "A" => Ok(ItemKind::Album {
                artist: columns.artist,
                etc: columns.etc,
            }),
            "M" => Ok(ItemKind::Movie {
                director: columns.director,
                actor: columns.actor,
            }),
            other => Err(format!("unknown item dtype: {other}")),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
