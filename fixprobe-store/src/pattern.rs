/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Case-insensitive search filters shared by the store and history log.

use regex::{Regex, RegexBuilder};
use tracing::debug;

/// A compiled search filter.
///
/// A filter that is not a valid regex is matched literally instead. An empty
/// filter matches everything.
#[derive(Debug, Clone)]
pub struct Filter(Option<Regex>);

impl Filter {
    /// Compiles `filter`.
    #[must_use]
    pub fn new(filter: &str) -> Self {
        let build = |pattern: &str| RegexBuilder::new(pattern).case_insensitive(true).build();
        match build(filter) {
            Ok(regex) => Self(Some(regex)),
            Err(err) => {
                debug!(filter, %err, "filter is not a valid regex, matching literally");
                Self(build(&regex::escape(filter)).ok())
            }
        }
    }

    /// Returns true if `text` matches anywhere.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.0.as_ref().is_some_and(|regex| regex.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_is_case_insensitive() {
        assert!(Filter::new("neworder").is_match("35=D NewOrderSingle"));
    }

    #[test]
    fn test_invalid_regex_matches_literally() {
        let filter = Filter::new("55=[ABC");
        assert!(filter.is_match("8=FIX.4.2|55=[abc|"));
        assert!(!filter.is_match("8=FIX.4.2|55=A|"));
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(Filter::new("").is_match("anything"));
    }
}
