// ============================================================================
// Order Domain - Read-side shapes for the order aggregate
// ============================================================================
//
// - Value objects (OrderId, OrderStatus, Address, ItemKind)
// - Entities (normalized store rows: Member, Delivery, Item, Order, OrderLine)
// - Views (OrderHeader, OrderItemView, OrderView, FlatRow)
//
// ============================================================================

pub mod value_objects;
pub mod entities;
pub mod views;

// Re-export for convenience
pub use value_objects::*;
pub use entities::*;
pub use views::*;
