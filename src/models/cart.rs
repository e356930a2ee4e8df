use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

use super::{lenient, MergePolicy};

/// One selected service unit, as persisted under the cart key.
///
/// Every field is optional: entries written by older builds or by other
/// writers may omit any of them, and none of them is validated here. A field
/// holding a value that cannot be represented reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub studio_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal", skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Fractional quantities are kept as written
    #[serde(
        default,
        deserialize_with = "lenient::decimal",
        serialize_with = "lenient::serialize_quantity",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<Decimal>,
}

/// Request model for adding a service to the cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub studio_id: String,
    pub price: Option<Decimal>,
    pub quantity: Option<Decimal>,
}

/// The full ordered sequence of cart items at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
}

/// Outcome of decoding the raw persisted cart value.
///
/// Decoding never fails towards the caller; a malformed value is reported
/// here and read as an empty cart by [`SnapshotRead::into_snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotRead {
    /// Nothing stored under the key
    Absent,
    /// The stored value parsed as a snapshot
    Decoded(CartSnapshot),
    /// The stored value is not a valid snapshot
    Malformed { reason: String },
}

/// Projection shown by the persistent summary bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub unique_services: usize,
    pub line_count: usize,
    pub studio_id: Option<String>,
    pub subtotal: Decimal,
}

/// Generate a fallback service identifier for items that arrive without one
pub fn generate_service_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Count distinct non-empty service ids, optionally scoped to one studio.
///
/// An empty studio filter is treated as no filter.
pub fn count_unique_services(items: &[CartItem], studio_filter: Option<&str>) -> usize {
    items
        .iter()
        .filter(|item| item.belongs_to(studio_filter))
        .filter_map(CartItem::service_key)
        .collect::<HashSet<_>>()
        .len()
}

impl CartItem {
    /// Create a cart item for a service offered by a studio
    pub fn new(service_id: impl Into<String>, studio_id: impl Into<String>) -> Self {
        Self {
            service_id: Some(service_id.into()),
            studio_id: Some(studio_id.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_quantity(mut self, quantity: impl Into<Decimal>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    /// The service id if present and non-empty
    pub fn service_key(&self) -> Option<&str> {
        self.service_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Whether this item is in scope for the given studio filter
    pub fn belongs_to(&self, studio_filter: Option<&str>) -> bool {
        match studio_filter {
            None | Some("") => true,
            Some(studio) => self.studio_id.as_deref() == Some(studio),
        }
    }

    /// Price times quantity, when both are present and the product is in range
    pub fn line_total(&self) -> Option<Decimal> {
        match (self.price, self.quantity) {
            (Some(price), Some(quantity)) => price.checked_mul(quantity),
            _ => None,
        }
    }
}

impl From<NewCartItem> for CartItem {
    fn from(request: NewCartItem) -> Self {
        Self {
            service_id: Some(
                request
                    .service_id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(generate_service_id),
            ),
            service_name: request.service_name,
            studio_id: Some(request.studio_id),
            price: request.price,
            quantity: request.quantity,
        }
    }
}

impl CartSnapshot {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CartItem> {
        self.items.iter()
    }

    /// Decode the raw persisted value; `None` means the key is absent.
    ///
    /// Only a value that is not a JSON array is malformed. Array entries that
    /// are not objects are dropped one by one, keeping the rest of the cart.
    pub fn decode(raw: Option<&str>) -> SnapshotRead {
        let raw = match raw {
            None => return SnapshotRead::Absent,
            Some(raw) => raw,
        };

        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
            Ok(entries) => entries,
            Err(e) => {
                return SnapshotRead::Malformed {
                    reason: e.to_string(),
                }
            }
        };

        let items = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<CartItem>(entry) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(index, error = %e, "Dropping unreadable cart entry");
                    None
                }
            })
            .collect();

        SnapshotRead::Decoded(CartSnapshot::new(items))
    }

    /// Encode the snapshot as the JSON array stored under the cart key
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn count_unique_services(&self, studio_filter: Option<&str>) -> usize {
        count_unique_services(&self.items, studio_filter)
    }

    /// Items in scope for the given studio filter
    pub fn for_studio<'a>(&'a self, studio_filter: Option<&'a str>) -> impl Iterator<Item = &'a CartItem> + 'a {
        self.items
            .iter()
            .filter(move |item| item.belongs_to(studio_filter))
    }

    /// Studio of the first line item
    pub fn first_studio_id(&self) -> Option<&str> {
        self.items.first().and_then(|item| item.studio_id.as_deref())
    }

    /// Sum of line totals over items that carry both price and quantity.
    /// Lines that would push the total out of range are left out.
    pub fn subtotal(&self, studio_filter: Option<&str>) -> Decimal {
        let mut total = Decimal::ZERO;
        for item in self.for_studio(studio_filter) {
            if item.price.is_none() || item.quantity.is_none() {
                continue;
            }
            match item.line_total().and_then(|line| total.checked_add(line)) {
                Some(sum) => total = sum,
                None => warn!(
                    service_id = item.service_id.as_deref().unwrap_or("-"),
                    "Line total out of range, left out of subtotal"
                ),
            }
        }
        total
    }

    /// Add an item according to the merge policy
    pub fn add(&mut self, item: CartItem, policy: MergePolicy) {
        if policy == MergePolicy::Merge {
            if let Some(existing) = self.items.iter_mut().find(|existing| {
                existing.service_key().is_some()
                    && existing.service_key() == item.service_key()
                    && existing.studio_id == item.studio_id
            }) {
                let quantity = existing
                    .quantity
                    .unwrap_or(Decimal::ONE)
                    .saturating_add(item.quantity.unwrap_or(Decimal::ONE));
                existing.quantity = Some(quantity);
                return;
            }
        }
        self.items.push(item);
    }

    /// Remove every line for a service, optionally scoped to a studio.
    /// Returns the number of removed lines.
    pub fn remove_service(&mut self, service_id: &str, studio_filter: Option<&str>) -> usize {
        let original_len = self.items.len();
        self.items.retain(|item| {
            !(item.service_id.as_deref() == Some(service_id) && item.belongs_to(studio_filter))
        });
        original_len - self.items.len()
    }

    pub fn summary(&self, studio_filter: Option<&str>) -> CartSummary {
        CartSummary {
            unique_services: self.count_unique_services(studio_filter),
            line_count: self.for_studio(studio_filter).count(),
            studio_id: self.first_studio_id().map(str::to_string),
            subtotal: self.subtotal(studio_filter),
        }
    }
}

impl FromIterator<CartItem> for CartSnapshot {
    fn from_iter<I: IntoIterator<Item = CartItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl SnapshotRead {
    /// Collapse the decode outcome into a snapshot; absent and malformed read as empty
    pub fn into_snapshot(self) -> CartSnapshot {
        match self {
            SnapshotRead::Decoded(snapshot) => snapshot,
            SnapshotRead::Absent | SnapshotRead::Malformed { .. } => CartSnapshot::empty(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, SnapshotRead::Malformed { .. })
    }
}

impl CartSummary {
    /// "1 Service" or "N Services"
    pub fn label(&self) -> String {
        if self.unique_services == 1 {
            "1 Service".to_string()
        } else {
            format!("{} Services", self.unique_services)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn create_test_snapshot() -> CartSnapshot {
        CartSnapshot::new(vec![
            CartItem::new("1", "studio-a")
                .with_name("Dry Cleaning")
                .with_price(dec!(8.99))
                .with_quantity(2),
            CartItem::new("2", "studio-a")
                .with_name("Wash & Fold")
                .with_price(dec!(2.49))
                .with_quantity(4),
            CartItem::new("1", "studio-b")
                .with_name("Dry Cleaning")
                .with_price(dec!(9.50))
                .with_quantity(1),
        ])
    }

    #[test]
    fn test_count_unique_services_dedupes_by_service_id() {
        let snapshot = CartSnapshot::new(vec![
            CartItem::new("x", "A"),
            CartItem::new("x", "A"),
            CartItem::new("x", "A"),
        ]);

        assert_eq!(snapshot.count_unique_services(None), 1);
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_count_unique_services_with_studio_filter() {
        let snapshot = CartSnapshot::new(vec![CartItem::new("1", "A"), CartItem::new("2", "B")]);

        assert_eq!(snapshot.count_unique_services(Some("A")), 1);
        assert_eq!(snapshot.count_unique_services(Some("C")), 0);
        assert_eq!(snapshot.count_unique_services(None), 2);
    }

    #[test]
    fn test_count_unique_services_skips_missing_and_empty_ids() {
        let snapshot = CartSnapshot::new(vec![
            CartItem {
                studio_id: Some("A".to_string()),
                ..Default::default()
            },
            CartItem::new("", "A"),
            CartItem::new("1", "A"),
        ]);

        assert_eq!(snapshot.count_unique_services(Some("A")), 1);
    }

    #[test]
    fn test_empty_studio_filter_means_all_studios() {
        let snapshot = create_test_snapshot();
        assert_eq!(
            snapshot.count_unique_services(Some("")),
            snapshot.count_unique_services(None)
        );
    }

    #[test]
    fn test_decode_absent_and_malformed_read_as_empty() {
        assert_eq!(CartSnapshot::decode(None), SnapshotRead::Absent);

        let malformed = CartSnapshot::decode(Some("not json"));
        assert!(malformed.is_malformed());
        assert!(malformed.into_snapshot().is_empty());

        let wrong_shape = CartSnapshot::decode(Some("{\"serviceId\":\"1\"}"));
        assert!(wrong_shape.is_malformed());

        let scalar = CartSnapshot::decode(Some("42"));
        assert!(scalar.is_malformed());

        let empty = CartSnapshot::decode(Some("[]"));
        assert_eq!(empty, SnapshotRead::Decoded(CartSnapshot::empty()));
    }

    #[test]
    fn test_decode_storage_layout() {
        let raw = r#"[{"serviceId":"1","serviceName":"Ironing","studioId":"A","price":4.99,"quantity":3},{"studioId":"B","extra":true}]"#;

        let snapshot = CartSnapshot::decode(Some(raw)).into_snapshot();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.items[0].service_id.as_deref(), Some("1"));
        assert_eq!(snapshot.items[0].price, Some(dec!(4.99)));
        assert_eq!(snapshot.items[0].quantity, Some(dec!(3)));
        assert_eq!(snapshot.items[1].service_id, None);
        assert_eq!(snapshot.items[1].studio_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_decode_keeps_cart_when_one_entry_has_unusual_numbers() {
        let raw = r#"[
            {"serviceId":"1","studioId":"A","price":4.99,"quantity":2},
            {"serviceId":"2","studioId":"A","price":3.00,"quantity":1.5},
            {"serviceId":"3","studioId":"A","price":1e30,"quantity":"4"},
            {"serviceId":4,"studioId":"A","quantity":[1]}
        ]"#;

        let read = CartSnapshot::decode(Some(raw));
        assert!(!read.is_malformed());
        let snapshot = read.into_snapshot();

        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.items[1].quantity, Some(dec!(1.5)));
        assert_eq!(snapshot.items[2].price, None);
        assert_eq!(snapshot.items[2].quantity, Some(dec!(4)));
        assert_eq!(snapshot.items[3].service_id.as_deref(), Some("4"));
        assert_eq!(snapshot.items[3].quantity, None);
        assert_eq!(snapshot.count_unique_services(Some("A")), 4);
        assert_eq!(snapshot.subtotal(None), dec!(14.48)); // 9.98 + 4.50
    }

    #[test]
    fn test_decode_drops_only_non_object_entries() {
        let snapshot =
            CartSnapshot::decode(Some(r#"[{"serviceId":"1"}, 7, "x", null, {"serviceId":"2"}]"#))
                .into_snapshot();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.items[1].service_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_fractional_quantity_round_trips() {
        let snapshot = CartSnapshot::new(vec![
            CartItem::new("1", "A").with_quantity(dec!(1.5)),
            CartItem::new("2", "A").with_quantity(3),
        ]);

        let json = snapshot.encode().unwrap();
        assert!(json.contains("\"quantity\":1.5"));
        assert!(json.contains("\"quantity\":3}"));
        assert_eq!(CartSnapshot::decode(Some(&json)).into_snapshot(), snapshot);
    }

    #[test]
    fn test_subtotal_skips_lines_out_of_range() {
        let snapshot = CartSnapshot::new(vec![
            CartItem::new("big", "A")
                .with_price(dec!(100000000000000000000))
                .with_quantity(i64::MAX),
            CartItem::new("max", "A")
                .with_price(Decimal::MAX)
                .with_quantity(1),
            CartItem::new("more", "A")
                .with_price(Decimal::MAX)
                .with_quantity(1),
            CartItem::new("small", "A")
                .with_price(dec!(2.50))
                .with_quantity(2),
        ]);

        assert_eq!(snapshot.items[0].line_total(), None);

        let summary = snapshot.summary(None);
        assert_eq!(summary.unique_services, 4);
        assert_eq!(summary.subtotal, Decimal::MAX);
    }

    #[test]
    fn test_encode_omits_absent_fields() {
        let snapshot = CartSnapshot::new(vec![CartItem::new("y", "B").with_quantity(2)]);

        let json = snapshot.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            value,
            serde_json::json!([{"serviceId": "y", "studioId": "B", "quantity": 2}])
        );
    }

    #[test]
    fn test_negative_values_are_kept() {
        let snapshot = CartSnapshot::new(vec![CartItem::new("1", "A")
            .with_price(dec!(-5))
            .with_quantity(-2)]);

        let decoded = CartSnapshot::decode(Some(&snapshot.encode().unwrap())).into_snapshot();

        assert_eq!(decoded.items[0].quantity, Some(dec!(-2)));
        assert_eq!(decoded.subtotal(None), dec!(10));
    }

    #[test]
    fn test_subtotal_and_summary() {
        let snapshot = create_test_snapshot();

        let summary = snapshot.summary(Some("studio-a"));
        assert_eq!(summary.unique_services, 2);
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.studio_id.as_deref(), Some("studio-a"));
        assert_eq!(summary.subtotal, dec!(27.94)); // 17.98 + 9.96
        assert_eq!(summary.label(), "2 Services");

        let all = snapshot.summary(None);
        assert_eq!(all.subtotal, dec!(37.44));
    }

    #[test]
    fn test_summary_label_singular() {
        let snapshot = CartSnapshot::new(vec![CartItem::new("1", "A"), CartItem::new("1", "A")]);
        assert_eq!(snapshot.summary(None).label(), "1 Service");
    }

    #[test]
    fn test_add_append_keeps_duplicate_lines() {
        let mut snapshot = CartSnapshot::empty();
        snapshot.add(CartItem::new("1", "A").with_quantity(1), MergePolicy::Append);
        snapshot.add(CartItem::new("1", "A").with_quantity(2), MergePolicy::Append);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.count_unique_services(None), 1);
    }

    #[test]
    fn test_add_merge_folds_quantities() {
        let mut snapshot = CartSnapshot::empty();
        snapshot.add(CartItem::new("1", "A").with_quantity(1), MergePolicy::Merge);
        snapshot.add(CartItem::new("1", "A").with_quantity(2), MergePolicy::Merge);
        snapshot.add(CartItem::new("1", "B").with_quantity(1), MergePolicy::Merge);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.items[0].quantity, Some(dec!(3)));
    }

    #[test]
    fn test_add_merge_saturates_large_quantities() {
        let mut snapshot = CartSnapshot::empty();
        snapshot.add(CartItem::new("1", "A").with_quantity(i64::MAX), MergePolicy::Merge);
        snapshot.add(CartItem::new("1", "A").with_quantity(1), MergePolicy::Merge);
        assert_eq!(
            snapshot.items[0].quantity,
            Some(Decimal::from(i64::MAX) + Decimal::ONE)
        );

        snapshot.add(CartItem::new("2", "A").with_quantity(Decimal::MAX), MergePolicy::Merge);
        snapshot.add(CartItem::new("2", "A"), MergePolicy::Merge);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.items[1].quantity, Some(Decimal::MAX));
    }

    #[test]
    fn test_remove_service() {
        let mut snapshot = create_test_snapshot();

        let removed = snapshot.remove_service("1", Some("studio-a"));
        assert_eq!(removed, 1);
        assert_eq!(snapshot.len(), 2);

        let removed = snapshot.remove_service("1", None);
        assert_eq!(removed, 1);
        assert_eq!(snapshot.count_unique_services(None), 1);

        assert_eq!(snapshot.remove_service("missing", None), 0);
    }

    #[test]
    fn test_new_cart_item_generates_service_id() {
        let item: CartItem = NewCartItem {
            studio_id: "A".to_string(),
            ..Default::default()
        }
        .into();

        assert!(item.service_key().is_some());
        assert_eq!(item.studio_id.as_deref(), Some("A"));

        let other: CartItem = NewCartItem {
            studio_id: "A".to_string(),
            service_id: Some(String::new()),
            ..Default::default()
        }
        .into();
        assert_ne!(item.service_id, other.service_id);
    }
}
