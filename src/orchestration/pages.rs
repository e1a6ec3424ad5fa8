//! Lazy page cursor over the membership source.

use crate::datasource::{DataSourceError, MembershipSource};
use crate::domain::MembershipRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub offset: usize,
    pub page_size: usize,
}

/// One fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub records: Vec<MembershipRecord>,
}

/// Finite, non-restartable sequence of membership pages.
///
/// A page shorter than the page size is the last one. An error also ends the
/// sequence.
#[derive(Debug)]
pub struct Pages<'a> {
    source: &'a dyn MembershipSource,
    cursor: PaginationCursor,
    exhausted: bool,
}

impl<'a> Pages<'a> {
    pub fn new(source: &'a dyn MembershipSource, page_size: usize) -> Self {
        Self {
            source,
            cursor: PaginationCursor {
                offset: 0,
                page_size: page_size.max(1),
            },
            exhausted: false,
        }
    }

    pub fn cursor(&self) -> PaginationCursor {
        self.cursor
    }

    pub async fn next_page(&mut self) -> Result<Option<Page>, DataSourceError> {
        if self.exhausted {
            return Ok(None);
        }

        let PaginationCursor { offset, page_size } = self.cursor;
        let records = match self.source.fetch_memberships(offset, page_size).await {
            Ok(records) => records,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        if records.len() < page_size {
            self.exhausted = true;
        } else {
            self.cursor.offset += page_size;
        }

        Ok(Some(Page { offset, records }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockMembershipSource;
    use crate::domain::ContactId;

    fn source(n: usize) -> MockMembershipSource {
        MockMembershipSource::new().with_memberships(
            (0..n)
                .map(|i| MembershipRecord::new(ContactId::new(i.to_string()), "1"))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_pages_stop_on_short_page() {
        let mock = source(237);
        let mut pages = Pages::new(&mock, 100);
        let mut sizes = Vec::new();
        while let Some(page) = pages.next_page().await.unwrap() {
            sizes.push((page.offset, page.records.len()));
        }
        assert_eq!(sizes, vec![(0, 100), (100, 100), (200, 37)]);
        assert_eq!(mock.page_requests(), vec![(0, 100), (100, 100), (200, 100)]);

        // stays finished
        assert!(pages.next_page().await.unwrap().is_none());
        assert_eq!(mock.page_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_one_empty_page() {
        let mock = source(200);
        let mut pages = Pages::new(&mock, 100);
        let mut count = 0;
        while let Some(_page) = pages.next_page().await.unwrap() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(mock.page_requests().last(), Some(&(200, 100)));
    }

    #[tokio::test]
    async fn test_error_ends_sequence() {
        let mock = source(300).with_failing_page(100);
        let mut pages = Pages::new(&mock, 100);
        assert!(pages.next_page().await.unwrap().is_some());
        assert!(pages.next_page().await.is_err());
        assert!(pages.next_page().await.unwrap().is_none());
        assert_eq!(pages.cursor().offset, 100);
    }
}
