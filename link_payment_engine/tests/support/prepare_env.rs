use link_payment_engine::{
    db_types::{
        DraftOrderRef,
        HistoryAction,
        NewHistoryEntry,
        NewMerchantConfig,
        NewPaymentRecord,
        PaymentLinkDocument,
        PaymentRecord,
        ReserveResult,
    },
    traits::{MerchantManagement, PaymentRecordManagement},
    SqliteDatabase,
};
use log::*;
use lpg_common::Currency;
use serde_json::json;
use tempfile::TempDir;

pub const SHOP: &str = "my-shop.myshopify.com";
pub const BUSINESS_ID: &str = "biz_42";
pub const XRPL_ADDRESS: &str = "rN7n7otQDd6FczFgLdSqtcsAUxDkw6fzRH";
pub const TX_HASH: &str = "E3FE6EA3D48F0C2B639448020EA4F03D4F4F8FFDB243A852A0F59177921B4879";

/// A migrated database in a temporary directory. The directory is removed when this is dropped.
pub struct TestDb {
    pub db: SqliteDatabase,
    _dir: TempDir,
}

pub async fn prepare_test_env() -> TestDb {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("Error creating temporary directory");
    let url = format!("sqlite://{}", dir.path().join("link_gateway_test.db").display());
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    debug!("🚀️ Test database ready at {url}");
    TestDb { db, _dir: dir }
}

pub async fn seed_merchant(db: &SqliteDatabase) {
    let config = NewMerchantConfig {
        shop: SHOP.into(),
        link_business_id: BUSINESS_ID.into(),
        xrpl_address: XRPL_ADDRESS.into(),
        enabled: true,
    };
    db.upsert_merchant_config(config).await.expect("Error saving merchant config");
}

pub fn new_record(order_id: &str) -> NewPaymentRecord {
    NewPaymentRecord {
        shop: SHOP.into(),
        order_id: order_id.into(),
        order_name: format!("#{order_id}"),
        amount: "25.00".parse().unwrap(),
        currency: Currency::Usdc,
        order_details: None,
    }
}

/// Creates a pending payment with a processor link, as link creation would have left it.
pub async fn seed_payment(
    db: &SqliteDatabase,
    order_id: &str,
    link_payment_id: &str,
    draft_order_id: Option<&str>,
) -> PaymentRecord {
    let reserved = match db.reserve_checkout(new_record(order_id)).await.expect("Error reserving checkout") {
        ReserveResult::Reserved(r) => r,
        ReserveResult::AlreadyExists(r) => panic!("Order {order_id} already has record #{}", r.id),
    };
    let doc = PaymentLinkDocument {
        link_payment_id: link_payment_id.into(),
        link_payment_url: format!("https://pay.link.xyz/{link_payment_id}"),
        draft_order: draft_order_id.map(|id| DraftOrderRef {
            draft_order_id: id.into(),
            draft_order_url: Some(format!("https://{SHOP}/admin/draft_orders/1")),
        }),
        history: NewHistoryEntry::new(HistoryAction::Created, json!({ "paymentId": link_payment_id })),
    };
    db.upsert_by_link_payment_id(reserved.id, doc).await.expect("Error saving payment link")
}

/// A processor notification body.
pub fn webhook_body(link_payment_id: &str, status: &str, tx_hash: Option<&str>, confirmations: Option<i64>) -> Vec<u8> {
    json!({
        "event": format!("payment.{status}"),
        "linkPaymentId": link_payment_id,
        "status": status,
        "xrplTxHash": tx_hash,
        "confirmations": confirmations,
        "timestamp": "2024-06-01T12:00:00Z"
    })
    .to_string()
    .into_bytes()
}

pub fn actions(record: &PaymentRecord) -> Vec<HistoryAction> {
    record.payment_history.iter().map(|e| e.action).collect()
}
