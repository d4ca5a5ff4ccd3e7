// src/olist.rs
//
// Compiled-in facts about the Olist Brazilian E-Commerce dataset. The
// filename → table mapping is the only "configuration" of the uploaders and
// is deliberately fixed in source.

/// Dataset slug on the hub, `owner/name`.
pub static DATASET_SLUG: &str = "olistbr/brazilian-ecommerce";

/// Destination dataset in BigQuery.
pub static BQ_DATASET_ID: &str = "olist";

/// Every CSV the published dataset is expected to contain.
pub static EXPECTED_FILES: &[&str] = &[
    "olist_customers_dataset.csv",
    "olist_geolocation_dataset.csv",
    "olist_order_items_dataset.csv",
    "olist_order_payments_dataset.csv",
    "olist_order_reviews_dataset.csv",
    "olist_orders_dataset.csv",
    "olist_products_dataset.csv",
    "olist_sellers_dataset.csv",
    "product_category_name_translation.csv",
];

/// CSV filename → destination table, loaded in this order.
pub static TABLE_MAPPING: &[(&str, &str)] = &[
    ("olist_customers_dataset.csv", "customers"),
    ("olist_geolocation_dataset.csv", "geolocation"),
    ("olist_order_items_dataset.csv", "order_items"),
    ("olist_order_payments_dataset.csv", "order_payments"),
    ("olist_order_reviews_dataset.csv", "order_reviews"),
    ("olist_orders_dataset.csv", "orders"),
    ("olist_products_dataset.csv", "products"),
    ("olist_sellers_dataset.csv", "sellers"),
    ("product_category_name_translation.csv", "product_category_name_translation"),
];

/// The file the smoke test inspects.
pub static ORDERS_FILE: &str = "olist_orders_dataset.csv";

/// Key column the orders file must carry.
pub static ORDERS_KEY_COLUMN: &str = "order_id";

/// A real download of the orders file has ~99k rows; anything under this is
/// a truncated or wrong-version download.
pub const MIN_ORDER_ROWS: usize = 1000;
