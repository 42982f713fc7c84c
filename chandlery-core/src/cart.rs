//! Client-held cart state.
//!
//! The cart lives with the browsing session, not the backend: the only
//! durable form is the serde snapshot the embedding client writes to
//! its own storage at checkpoint time. All operations are synchronous
//! and touch nothing but the in-memory state, so mutations can never
//! fail over the network and the buyer can always retry a checkout
//! from an unchanged cart.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::OrderLineItem;

/// One pending purchase line.
///
/// Invariant: `quantity >= 1`. Dropping the last unit removes the entry
/// from the cart instead of storing a zero quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: CompactString,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// Insertion-ordered collection of [`CartItem`], unique by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `quantity` units of a product into the cart.
    ///
    /// Adding an already-present product increments its quantity rather
    /// than inserting a duplicate entry. Zero-quantity adds are ignored.
    pub fn add(&mut self, product_id: impl Into<CompactString>, name: &str, unit_price: Decimal, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let product_id = product_id.into();
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(existing) => existing.quantity += quantity,
            None => self.items.push(CartItem {
                product_id,
                name: name.to_string(),
                unit_price,
                quantity,
            }),
        }
    }

    /// Remove a product entirely, whatever its quantity.
    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product_id != product_id);
    }

    /// Set the quantity of an existing entry.
    ///
    /// A target of zero removes the entry; unknown product ids are a
    /// no-op.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = quantity;
        }
    }

    /// Empty the cart. Called by the embedding client only after a
    /// confirmed checkout result.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Derived sum of `unit_price * quantity` over all entries.
    ///
    /// Never stored independently, so it cannot drift from the items.
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Copy the cart contents into an order line-item snapshot.
    pub fn to_line_items(&self) -> Vec<OrderLineItem> {
        self.items
            .iter()
            .map(|i| OrderLineItem {
                product_id: i.product_id.clone(),
                name: i.name.clone(),
                unit_price: i.unit_price,
                quantity: i.quantity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn price(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn adding_same_product_twice_merges_quantities() {
        let mut cart = Cart::new();
        cart.add("anchor-12", "Anchor 12kg", price(4_500), 1);
        cart.add("anchor-12", "Anchor 12kg", price(4_500), 2);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn set_quantity_zero_removes_the_entry() {
        let mut cart = Cart::new();
        cart.add("rope-30m", "Mooring rope 30m", price(1_999), 2);
        cart.add("shackle", "Bow shackle", price(350), 1);

        cart.set_quantity("rope-30m", 0);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total(), price(350));
    }

    #[test]
    fn total_matches_hand_computed_sum() {
        let mut cart = Cart::new();
        cart.add("p1", "P1", price(1_000), 2);
        cart.add("p2", "P2", price(550), 1);

        assert_eq!(cart.total(), price(2_550));
    }

    #[test]
    fn clear_empties_the_cart() {
        let mut cart = Cart::new();
        cart.add("p1", "P1", price(100), 1);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn serde_snapshot_round_trips() {
        let mut cart = Cart::new();
        cart.add("lamp", "Navigation lamp", price(8_250), 1);
        cart.add("flag-q", "Signal flag Q", price(900), 3);

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }

    /// Random mutation sequences: the derived total must always equal
    /// the sum over the remaining entries.
    #[test]
    fn total_is_consistent_under_random_mutation_sequences() {
        let mut rng = StdRng::seed_from_u64(0x5ea_f00d);
        let product_ids = ["p0", "p1", "p2", "p3", "p4"];

        for _ in 0..50 {
            let mut cart = Cart::new();
            for _ in 0..200 {
                let id = product_ids[rng.random_range(0..product_ids.len())];
                match rng.random_range(0..3) {
                    0 => {
                        let cents: i64 = rng.random_range(1..10_000);
                        cart.add(id, id, price(cents), rng.random_range(1..4));
                    }
                    1 => cart.remove(id),
                    _ => cart.set_quantity(id, rng.random_range(0..5)),
                }

                let expected: Decimal = cart
                    .items()
                    .iter()
                    .map(|i| i.unit_price * Decimal::from(i.quantity))
                    .sum();
                assert_eq!(cart.total(), expected);
                assert!(cart.items().iter().all(|i| i.quantity >= 1));
            }
        }
    }
}
