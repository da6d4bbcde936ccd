//! `*` wildcard values compiled to anchored, case-insensitive regexes

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone)]
pub(crate) struct Wildcard {
    regex: Regex,
}

impl Wildcard {
    pub(crate) fn new(pattern: &str) -> Result<Self, regex::Error> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = RegexBuilder::new(&format!("^{}$", body))
            .case_insensitive(true)
            .build()?;
        Ok(Wildcard { regex })
    }

    pub(crate) fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}
