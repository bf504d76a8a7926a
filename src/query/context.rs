use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Independently paginated part of an address view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Transfers,
    Issuances,
    Holders,
    Chainy,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfers => "transfers",
            Self::Issuances => "issuances",
            Self::Holders => "holders",
            Self::Chainy => "chainy",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfers" => Ok(Self::Transfers),
            "issuances" => Ok(Self::Issuances),
            "holders" => Ok(Self::Holders),
            "chainy" => Ok(Self::Chainy),
            other => Err(format!("unknown section: {}", other)),
        }
    }
}

/// Regular expression matched (unanchored) against text fields.
///
/// Input that does not parse as a regex is matched literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFilter(String);

impl TextFilter {
    /// `None` for blank input; a blank filter disables filtering
    pub fn new(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let pattern = match Regex::new(raw) {
            Ok(_) => raw.to_string(),
            Err(_) => regex::escape(raw),
        };
        Some(Self(pattern))
    }

    pub fn pattern(&self) -> &str {
        &self.0
    }
}

/// Paging and filtering state of one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryContext {
    page_size: Option<u64>,
    pages: HashMap<Section, u64>,
    refresh: Option<Section>,
    filter: Option<TextFilter>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = (page_size > 0).then_some(page_size);
        self
    }

    pub fn with_page(mut self, section: Section, page: u64) -> Self {
        self.pages.insert(section, page.max(1));
        self
    }

    /// Re-render only `section`
    pub fn with_refresh(mut self, section: Section) -> Self {
        self.refresh = Some(section);
        self
    }

    pub fn with_filter(mut self, raw: &str) -> Self {
        self.filter = TextFilter::new(raw);
        self
    }

    pub fn page_size(&self) -> Option<u64> {
        self.page_size
    }

    pub fn refresh(&self) -> Option<Section> {
        self.refresh
    }

    pub fn filter(&self) -> Option<&TextFilter> {
        self.filter.as_ref()
    }

    pub fn page(&self, section: Section) -> u64 {
        self.pages.get(&section).copied().unwrap_or(1)
    }

    /// Item offset of the section's current page
    pub fn offset(&self, section: Section, limit: u64) -> u64 {
        match self.page(section) {
            1 => 0,
            page => (page - 1).saturating_mul(limit),
        }
    }

    /// Whether `section` should be computed in this request
    pub fn renders(&self, section: Section) -> bool {
        self.refresh.is_none_or(|refresh| refresh == section)
    }
}
