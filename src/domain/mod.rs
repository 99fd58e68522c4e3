// ============================================================================
// Domain Layer
// ============================================================================
//
// Plain data for the order aggregate: what the store holds and what the
// read model hands back. No I/O lives here.
//
// ============================================================================

pub mod order;
