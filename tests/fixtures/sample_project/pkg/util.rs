//! Pricing helpers shared by the inventory tool.

use std::collections::HashMap;

pub struct PriceList {
    prices: HashMap<String, u32>,
}

impl PriceList {
    pub fn price(&self, name: &str) -> Option<u32> {
        self.prices.get(name).copied()
    }
}
