//! Adapter for the supplier catalog feed.
//!
//! Feed lines are `title<TAB>author<TAB>isbn<TAB>price`, price in minor units.
//! Blank lines, `#` comments and a leading `title` header row are skipped.

use crate::model::book::BookDraft;
use crate::model::validation::ValidationError;

const FIELD_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogFeedAdapter;

impl CatalogFeedAdapter {
    /// Converts every feed line into a draft.
    ///
    /// Shape errors for all lines are collected under the `feed` field; field
    /// rules (ISBN shape, lengths) are left to `BookDraft::normalized`.
    pub fn parse(&self, feed: &str) -> Result<Vec<BookDraft>, ValidationError> {
        let mut drafts = Vec::new();
        let mut errors = ValidationError::new();

        for (index, raw) in feed.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            if drafts.is_empty() && errors.is_empty() && is_header(line) {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() != FIELD_COUNT {
                errors.push(
                    "feed",
                    Some(line),
                    format!(
                        "line {line_no}: expected {FIELD_COUNT} tab-separated fields, found {}",
                        fields.len()
                    ),
                );
                continue;
            }

            match fields[3].parse::<i64>() {
                Ok(price) => drafts.push(BookDraft::new(fields[0], fields[1], fields[2], price)),
                Err(_) => errors.push(
                    "feed",
                    Some(line),
                    format!("line {line_no}: price `{}` is not an integer", fields[3]),
                ),
            }
        }

        errors.into_result()?;
        Ok(drafts)
    }
}

fn is_header(line: &str) -> bool {
    line.split('\t')
        .next()
        .is_some_and(|first| first.trim().eq_ignore_ascii_case("title"))
}

#[cfg(test)]
mod tests {
    use super::CatalogFeedAdapter;

    #[test]
    fn parses_lines_and_skips_header_and_comments() {
        let feed = "title\tauthor\tisbn\tprice\n\
                    # spring list\n\
                    Dune\tFrank Herbert\t978-0441013593\t1999\n\
                    \n\
                    Emma\tJane Austen\t9780141439587\t850\n";
        let drafts = CatalogFeedAdapter.parse(feed).expect("valid feed");
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "Dune");
        assert_eq!(drafts[0].isbn, "978-0441013593");
        assert_eq!(drafts[1].price, 850);
        assert!(drafts[1].available);
    }

    #[test]
    fn reports_every_malformed_line() {
        let feed = "Dune\tFrank Herbert\t9780441013593\n\
                    Emma\tJane Austen\t9780141439587\tcheap\n";
        let err = CatalogFeedAdapter.parse(feed).expect_err("invalid feed");
        let messages: Vec<_> = err.violations().iter().map(|v| v.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("line 1:"));
        assert!(messages[1].starts_with("line 2:"));
    }
}
