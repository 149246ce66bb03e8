use std::slice;

use super::ItemDescriptor;
use crate::types::ItemId;

/// A point-in-time snapshot returned by `list`, ordered by uri
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemList {
    items: Vec<ItemDescriptor>,
}

impl ItemList {
    pub(crate) fn new(items: Vec<ItemDescriptor>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ItemDescriptor> {
        self.items.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, ItemDescriptor> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn uris(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.uri.as_str()).collect()
    }
}

impl IntoIterator for ItemList {
    type Item = ItemDescriptor;
    type IntoIter = std::vec::IntoIter<ItemDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a ItemDescriptor;
    type IntoIter = slice::Iter<'a, ItemDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
