// Storage key namespace - these strings are on disk, never rename them

/// Saved products collection
pub const SAVED_PRODUCTS: &str = "dealcheck_saved_products";

/// Monitored products collection
pub const MONITORED_PRODUCTS: &str = "dealcheck_monitored_products";

/// Reserved. Nothing reads or writes it yet.
pub const USER_PREFERENCES: &str = "dealcheck_user_preferences";
