//! Order and order item model plus sales statistics read models.
//!
//! # Invariants
//! - `total_amount` equals the sum of `price * quantity` over `items`.
//! - Item `price` is the book price captured when the order was written.

use crate::model::book::BookId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub type OrderId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether `cancel` may move an order in this state to `Cancelled`.
    pub fn is_cancellable(self) -> bool {
        !matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown order status `{value}`"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub total_amount: i64,
    pub order_date: i64,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

/// Order line joined with the book it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub book_id: BookId,
    pub book_title: String,
    pub book_author: String,
    pub quantity: u32,
    pub price: i64,
}

/// Order line before persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub book_id: BookId,
    pub quantity: u32,
    pub price: i64,
}

/// Sums `price * quantity` over all lines, or `None` when the total does
/// not fit in an `i64`.
pub fn order_total(items: &[NewOrderItem]) -> Option<i64> {
    items.iter().try_fold(0_i64, |total, item| {
        item.price
            .checked_mul(i64::from(item.quantity))
            .and_then(|line| total.checked_add(line))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatistics {
    pub total_orders: u64,
    pub pending_orders: u64,
    pub confirmed_orders: u64,
    pub shipped_orders: u64,
    pub delivered_orders: u64,
    pub cancelled_orders: u64,
    /// Sum over non-cancelled orders.
    pub total_revenue: i64,
    /// Rounded mean over non-cancelled orders, zero when there are none.
    pub average_order_amount: i64,
}

/// Revenue aggregate over non-cancelled orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevenueSummary {
    pub total_revenue: i64,
    pub average_order_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyOrderStatistics {
    /// UTC calendar day formatted as `YYYY-MM-DD`.
    pub date: String,
    pub order_count: u64,
    pub total_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSellingBook {
    pub book_id: BookId,
    pub book_title: String,
    pub book_author: String,
    pub total_quantity: u64,
    pub total_revenue: i64,
}
