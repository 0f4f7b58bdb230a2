//! Lazy, paginated iteration over an entity's drafts

use std::collections::VecDeque;

use super::DraftStore;
use crate::errors::ExError;
use crate::model::Draft;

pub const DEFAULT_PAGE_SIZE: usize = 64;

/// Every draft of one entity, ascending by sequence
///
/// Nothing is read until iteration starts. Each call to [`DraftList::iter`]
/// starts again from the first draft, so the list can be walked any number
/// of times.
pub struct DraftList<'s> {
    store: &'s dyn DraftStore,
    entity_id: String,
    page_size: usize,
}

impl<'s> DraftList<'s> {
    pub fn new(store: &'s dyn DraftStore, entity_id: impl Into<String>) -> Self {
        Self {
            store,
            entity_id: entity_id.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Drafts fetched per backend read (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn iter(&self) -> DraftIter<'s> {
        DraftIter {
            store: self.store,
            entity_id: self.entity_id.clone(),
            page_size: self.page_size,
            after_sequence: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Read the whole list eagerly
    ///
    /// # Errors
    ///
    /// The first backend failure encountered.
    pub fn to_vec(&self) -> Result<Vec<Draft>, ExError> {
        self.iter().collect()
    }
}

impl<'a, 's> IntoIterator for &'a DraftList<'s> {
    type Item = Result<Draft, ExError>;
    type IntoIter = DraftIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct DraftIter<'s> {
    store: &'s dyn DraftStore,
    entity_id: String,
    page_size: usize,
    after_sequence: u64,
    buffer: VecDeque<Draft>,
    exhausted: bool,
}

impl Iterator for DraftIter<'_> {
    type Item = Result<Draft, ExError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            match self
                .store
                .drafts_page(&self.entity_id, self.after_sequence, self.page_size)
            {
                Ok(page) => {
                    self.exhausted = page.len() < self.page_size;
                    self.buffer.extend(page);
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }

        let draft = self.buffer.pop_front()?;
        self.after_sequence = draft.sequence();
        Some(Ok(draft))
    }
}
