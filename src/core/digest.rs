use crate::domain::model::{Digest, Group, Listing, Locality};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt::Write;

pub const DEFAULT_CURRENCY: &str = "PLN";
pub const DEFAULT_DESCRIPTION_LIMIT: usize = 500;
pub const TRUNCATION_MARKER: &str = "...";
pub const SEPARATOR_WIDTH: usize = 50;

pub const UNKNOWN_COMPANY: &str = "unknown";
pub const NO_LOCATION: &str = "No location info";
pub const NO_LINK: &str = "No link available";
pub const NO_DESCRIPTION: &str = "No description available";

pub fn default_remote_keywords() -> Vec<String> {
    ["remote", "zdalna", "zdalnie", "home office"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DigestSettings {
    /// Rendered first, in this order.
    pub priority_cities: Vec<String>,
    pub remote_keywords: Vec<String>,
    pub default_currency: String,
    /// Maximum description length in characters, marker included.
    pub description_limit: usize,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            priority_cities: Vec::new(),
            remote_keywords: default_remote_keywords(),
            default_currency: DEFAULT_CURRENCY.to_string(),
            description_limit: DEFAULT_DESCRIPTION_LIMIT,
        }
    }
}

/// First comma-separated segment of a location string, trimmed.
pub fn locality_token(location: Option<&str>) -> Option<&str> {
    location
        .and_then(|l| l.split(',').next())
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn truncate_description(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

pub fn subject_line(count: usize, terms: &str) -> String {
    format!("{} new {} job offers", count, terms)
}

/// Groups and renders new listings into the digest text. Pure: the
/// timestamp in the header is supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct DigestFormatter {
    settings: DigestSettings,
    remote_keywords: Vec<String>,
}

impl DigestFormatter {
    pub fn new(settings: DigestSettings) -> Self {
        let remote_keywords = settings
            .remote_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            settings,
            remote_keywords,
        }
    }

    fn is_remote(&self, listing: &Listing) -> bool {
        let title = listing.title.to_lowercase();
        let description = listing
            .description
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.remote_keywords
            .iter()
            .any(|k| title.contains(k.as_str()) || description.contains(k.as_str()))
    }

    fn priority_index(&self, token: &str) -> Option<usize> {
        self.settings
            .priority_cities
            .iter()
            .position(|city| city.trim() == token)
    }

    pub fn classify(&self, listing: &Listing) -> Locality {
        if self.is_remote(listing) {
            return Locality::Remote;
        }
        match locality_token(listing.location.as_deref()) {
            // A city header must never read like one of the fixed groups.
            Some(token) if token.eq_ignore_ascii_case(Locality::Remote.label()) => {
                Locality::Remote
            }
            Some(token) if token.eq_ignore_ascii_case(Locality::Unclassified.label()) => {
                Locality::Unclassified
            }
            Some(token) if self.priority_index(token).is_some() => {
                Locality::PriorityCity(token.to_string())
            }
            Some(token) => Locality::City(token.to_string()),
            None => Locality::Unclassified,
        }
    }

    /// Buckets listings in render order: priority cities (configured order),
    /// remote, other cities alphabetically, unclassified. Empty groups are
    /// omitted and each group keeps discovery order.
    pub fn group(&self, listings: Vec<Listing>) -> Vec<Group> {
        let mut priority: Vec<Vec<Listing>> = vec![Vec::new(); self.settings.priority_cities.len()];
        let mut remote = Vec::new();
        let mut cities: BTreeMap<String, Vec<Listing>> = BTreeMap::new();
        let mut unclassified = Vec::new();

        for listing in listings {
            match self.classify(&listing) {
                Locality::Remote => remote.push(listing),
                Locality::PriorityCity(token) => match self.priority_index(&token) {
                    Some(index) => priority[index].push(listing),
                    None => cities.entry(token).or_default().push(listing),
                },
                Locality::City(token) => cities.entry(token).or_default().push(listing),
                Locality::Unclassified => unclassified.push(listing),
            }
        }

        let mut groups = Vec::new();
        for (city, listings) in self.settings.priority_cities.iter().zip(priority) {
            if !listings.is_empty() {
                groups.push(Group {
                    locality: Locality::PriorityCity(city.trim().to_string()),
                    listings,
                });
            }
        }
        if !remote.is_empty() {
            groups.push(Group {
                locality: Locality::Remote,
                listings: remote,
            });
        }
        groups.extend(cities.into_iter().map(|(city, listings)| Group {
            locality: Locality::City(city),
            listings,
        }));
        if !unclassified.is_empty() {
            groups.push(Group {
                locality: Locality::Unclassified,
                listings: unclassified,
            });
        }
        groups
    }

    pub fn render_listing(&self, number: usize, listing: &Listing) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}. Title: {}", number, listing.title);
        let _ = writeln!(
            out,
            "Company: {}",
            listing.company.as_deref().unwrap_or(UNKNOWN_COMPANY)
        );
        if let Some(salary) = &listing.salary {
            let _ = writeln!(
                out,
                "Salary: {} - {} {}",
                format_amount(salary.min),
                format_amount(salary.max),
                salary
                    .currency
                    .as_deref()
                    .unwrap_or(&self.settings.default_currency)
            );
        }
        let _ = writeln!(
            out,
            "Location: {}",
            listing.location.as_deref().unwrap_or(NO_LOCATION)
        );
        let _ = writeln!(out, "Link: {}", listing.url.as_deref().unwrap_or(NO_LINK));
        let description = listing
            .description
            .as_deref()
            .map(|d| truncate_description(d, self.settings.description_limit))
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());
        let _ = writeln!(out, "Description: {}", description);
        let _ = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH));
        out.push('\n');
        out
    }

    pub fn render_group(&self, group: &Group) -> String {
        let mut out = format!(
            "=== {} ({}) ===\n\n",
            group.locality.label(),
            group.listings.len()
        );
        for (index, listing) in group.listings.iter().enumerate() {
            out.push_str(&self.render_listing(index + 1, listing));
        }
        out
    }

    pub fn render(
        &self,
        listings: Vec<Listing>,
        terms: &str,
        generated_at: NaiveDateTime,
    ) -> Digest {
        let listing_count = listings.len();
        let groups = self.group(listings);

        let mut body = format!(
            "{}\nGenerated: {}\n\n",
            subject_line(listing_count, terms),
            generated_at.format("%Y-%m-%d %H:%M")
        );
        for group in &groups {
            body.push_str(&self.render_group(group));
        }

        Digest {
            subject: subject_line(listing_count, terms),
            body,
            listing_count,
        }
    }
}
