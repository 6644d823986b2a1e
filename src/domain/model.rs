use std::collections::BTreeSet;

/// Identifiers of listings that were already delivered.
pub type Ledger = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
    pub currency: Option<String>,
}

/// One job posting as returned by the search API.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub salary: Option<SalaryRange>,
}

impl Listing {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company: None,
            location: None,
            description: None,
            url: None,
            salary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub terms: String,
    pub location: Option<String>,
    pub distance_km: Option<u32>,
    pub title_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Locality {
    Remote,
    PriorityCity(String),
    City(String),
    Unclassified,
}

impl Locality {
    pub fn label(&self) -> &str {
        match self {
            Locality::Remote => "Remote",
            Locality::PriorityCity(name) | Locality::City(name) => name,
            Locality::Unclassified => "Unspecified location",
        }
    }
}

/// Listings that share a locality, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub locality: Locality,
    pub listings: Vec<Listing>,
}

/// Rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub body: String,
    pub listing_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Output of the extract phase: the ledger as loaded and everything fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub ledger: Ledger,
    pub listings: Vec<Listing>,
}

/// Output of the transform phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub fetched: usize,
    pub invalid: usize,
    pub prior_ledger_size: usize,
    pub updated_ledger: Ledger,
    pub digest: Option<Digest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub invalid: usize,
    pub new_listings: usize,
    pub ledger_size: usize,
    pub delivered: bool,
    pub ledger_committed: bool,
}

impl RunReport {
    pub fn delivery_failed(&self) -> bool {
        self.new_listings > 0 && !self.delivered
    }
}
