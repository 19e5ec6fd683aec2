//! Protocol-visible bounds for prefix lookups

/// Maximum number of identifiers returned per context.
///
/// Clients treat a truncated match set as "refine the prefix", not as a page
/// boundary; there is no continuation token.
pub const TRUNCATE_LIMIT: usize = 20;
