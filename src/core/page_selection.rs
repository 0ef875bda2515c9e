use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A set of 1-indexed page numbers chosen for one paginated document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelection(BTreeSet<u32>);

impl PageSelection {
    pub fn all(page_count: u32) -> Self {
        Self((1..=page_count).collect())
    }

    pub fn from_pages(pages: impl IntoIterator<Item = u32>) -> Self {
        Self(pages.into_iter().filter(|page| *page >= 1).collect())
    }

    /// Parses user input such as `"1-3, 5"`. Ranges may be written either
    /// way round; pages outside `1..=page_count` and malformed tokens are
    /// dropped.
    pub fn parse(input: &str, page_count: u32) -> Self {
        let mut pages = BTreeSet::new();

        for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (start, end) = match token.split_once('-') {
                Some((a, b)) => match (a.trim().parse::<u32>(), b.trim().parse::<u32>()) {
                    (Ok(a), Ok(b)) => (a.min(b), a.max(b)),
                    _ => continue,
                },
                None => match token.parse::<u32>() {
                    Ok(page) => (page, page),
                    Err(_) => continue,
                },
            };

            let start = start.max(1);
            let end = end.min(page_count);
            if start <= end {
                pages.extend(start..=end);
            }
        }

        Self(pages)
    }

    /// Pages that exist in a document of `page_count` pages, ascending.
    pub fn pages_within(&self, page_count: u32) -> Vec<u32> {
        self.0
            .iter()
            .copied()
            .filter(|page| *page <= page_count)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges_and_singles() {
        let selection = PageSelection::parse("1-3, 5", 6);
        assert_eq!(selection.iter().collect::<Vec<_>>(), vec![1, 2, 3, 5]);
    }

    #[test]
    fn drops_out_of_range_and_malformed_tokens() {
        let selection = PageSelection::parse("0, 2, 9, x, 4-12, 3-", 5);
        assert_eq!(selection.iter().collect::<Vec<_>>(), vec![2, 4, 5]);
    }

    #[test]
    fn reversed_range_is_accepted() {
        let selection = PageSelection::parse("3-1", 4);
        assert_eq!(selection.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn pages_within_skips_pages_past_the_end() {
        let selection = PageSelection::from_pages([1, 99]);
        assert_eq!(selection.pages_within(3), vec![1]);
        assert_eq!(PageSelection::all(3).pages_within(3), vec![1, 2, 3]);
    }
}
