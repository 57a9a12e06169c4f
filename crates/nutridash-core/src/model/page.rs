use std::sync::Arc;

use super::Item;

/// A zero-indexed slice of a collection.
///
/// `last = true` is terminal: no page after `number` has any items.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow {
    pub items: Vec<Arc<Item>>,
    pub number: usize,
    pub last: bool,
}

impl PageWindow {
    pub fn empty_last(number: usize) -> Self {
        Self {
            items: Vec::new(),
            number,
            last: true,
        }
    }
}
