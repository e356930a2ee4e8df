use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{lenient, OrderStatus};

/// A previously placed order, as kept in the order history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio_name: Option<String>,
    /// Studio the order was placed with. Informational only: editing an
    /// order files its items under the studio the edit is made from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderLineItem>,
}

/// One line of a placed order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal", skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "lenient::decimal",
        serialize_with = "lenient::serialize_quantity",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<Decimal>,
}

/// Orders split the way the orders page shows them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersView {
    pub ongoing: Vec<OrderRecord>,
    pub completed: Vec<OrderRecord>,
}

impl OrderRecord {
    pub fn new(id: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            id: id.into(),
            studio_name: None,
            studio_id: None,
            amount: None,
            status,
            created_at: None,
            items: Vec::new(),
        }
    }

    pub fn with_studio_name(mut self, studio_name: impl Into<String>) -> Self {
        self.studio_name = Some(studio_name.into());
        self
    }

    pub fn with_items(mut self, items: Vec<OrderLineItem>) -> Self {
        self.items = items;
        self
    }

    /// First eight characters of the order id, as shown in "Order #…" labels
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((end, _)) => &self.id[..end],
            None => &self.id,
        }
    }

    /// Case-insensitive substring match on the studio name
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.studio_name
            .as_deref()
            .map(|name| name.to_lowercase().contains(&query))
            .unwrap_or(false)
    }
}

impl OrderLineItem {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: Some(service_id.into()),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_quantity(mut self, quantity: impl Into<Decimal>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }
}

impl OrdersView {
    /// Partition orders into ongoing and completed, keeping their order
    pub fn partition(orders: impl IntoIterator<Item = OrderRecord>) -> Self {
        let (ongoing, completed) = orders
            .into_iter()
            .partition(|order| order.status == OrderStatus::Ongoing);
        Self { ongoing, completed }
    }

    pub fn is_empty(&self) -> bool {
        self.ongoing.is_empty() && self.completed.is_empty()
    }
}
