//! Order aggregate, read-side projections and validation rules
//!
//! `Order` is the write-side aggregate as it arrives on the stream.
//! `OrderResponse` is the denormalized read view derived from it, and
//! `OrderPreview` the minimal projection used for list endpoints.
//! An order is either fully valid or rejected; there is no partial
//! acceptance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Full write-side order aggregate
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Order {
    #[validate(length(min = 1))]
    pub order_uid: String,
    #[validate(length(min = 1))]
    pub track_number: String,
    #[validate(length(min = 1))]
    pub entry: String,
    #[validate(length(min = 1))]
    pub locale: String,
    #[serde(default)]
    pub internal_signature: String,
    #[validate(length(min = 1))]
    pub customer_id: String,
    #[validate(length(min = 1))]
    pub delivery_service: String,
    #[serde(rename = "shardkey")]
    #[validate(length(min = 1))]
    pub shard_key: String,
    #[validate(range(min = 1))]
    pub sm_id: i32,
    pub date_created: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub oof_shard: String,
    pub created_at: DateTime<Utc>,

    #[validate(nested)]
    pub delivery: Delivery,
    #[validate(nested)]
    pub payment: Payment,
    #[validate(length(min = 1), nested)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Delivery {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(custom(function = validate_phone))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub zip: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[serde(default)]
    pub region: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Payment {
    #[validate(length(min = 1))]
    pub transaction: String,
    #[serde(default)]
    pub request_id: String,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(length(min = 1))]
    pub provider: String,
    #[validate(range(min = 1))]
    pub amount: i64,
    pub payment_dt: i64,
    #[serde(default)]
    pub bank: String,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub delivery_cost: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub goods_total: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub custom_fee: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Item {
    pub chrt_id: i64,
    #[validate(length(min = 1))]
    pub track_number: String,
    #[validate(range(min = 1))]
    pub price: i64,
    #[validate(length(min = 1))]
    pub rid: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub sale: i32,
    #[serde(default)]
    pub size: String,
    #[validate(range(min = 1))]
    pub total_price: i64,
    #[serde(default)]
    pub nm_id: i64,
    #[validate(length(min = 1))]
    pub brand: String,
    #[validate(range(min = 1))]
    pub status: i32,
}

/// Minimal projection for list endpoints, always store-sourced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderPreview {
    pub order_uid: String,
    pub track_number: String,
    pub customer_id: String,
    pub date_created: DateTime<Utc>,
}

/// Denormalized read view for single-order lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_uid: String,
    pub track_number: String,
    pub customer_id: String,
    pub date_created: DateTime<Utc>,
    pub delivery: DeliveryResponse,
    pub payment: PaymentResponse,
    pub items: Vec<ItemResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub name: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub transaction: String,
    pub currency: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub name: String,
    pub price: i64,
    pub brand: String,
    pub status: i32,
}

impl Order {
    /// Derive the read view. Deterministic; the view is never mutated
    /// independently of its source order.
    pub fn to_response(&self) -> OrderResponse {
        OrderResponse {
            order_uid: self.order_uid.clone(),
            track_number: self.track_number.clone(),
            customer_id: self.customer_id.clone(),
            date_created: self.date_created,
            delivery: DeliveryResponse {
                name: self.delivery.name.clone(),
                phone: self.delivery.phone.clone(),
                city: self.delivery.city.clone(),
                address: self.delivery.address.clone(),
                email: self.delivery.email.clone(),
            },
            payment: PaymentResponse {
                transaction: self.payment.transaction.clone(),
                currency: self.payment.currency.clone(),
                amount: self.payment.amount,
            },
            items: self
                .items
                .iter()
                .map(|item| ItemResponse {
                    name: item.name.clone(),
                    price: item.price,
                    brand: item.brand.clone(),
                    status: item.status,
                })
                .collect(),
        }
    }
}

/// Phone numbers must carry an international prefix, e.g. `+9720000000`.
fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() < 4 || !phone.starts_with('+') {
        return Err(ValidationError::new("phone"));
    }
    Ok(())
}
