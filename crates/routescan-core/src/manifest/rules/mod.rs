//! Rule-based field matching for manifest pages.

pub mod patterns;

pub use patterns::*;

use regex::Regex;
use tracing::{debug, warn};

use crate::models::{ExtractionRecord, LocationNumber, RouteId};

/// Cut a store name at the first whitespace-preceded "Phone" and trim it.
pub fn clean_store_name(raw: &str) -> String {
    let head = match PHONE_SUFFIX.find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    };
    head.trim().to_string()
}

/// A header pattern yielding a location number (group 1) and a store name
/// (group 2, passed through [`clean_store_name`]).
#[derive(Debug, Clone)]
pub struct HeaderRule {
    /// Name reported in logs, e.g. "X-Dock WH".
    pub name: String,
    pub pattern: Regex,
    /// Rules with a higher priority win when several headers match.
    pub priority: u8,
}

impl HeaderRule {
    pub fn new(name: impl Into<String>, pattern: Regex, priority: u8) -> Self {
        Self {
            name: name.into(),
            pattern,
            priority,
        }
    }

    /// First match of this rule in `text`.
    fn first_match(&self, text: &str) -> Option<HeaderMatch> {
        let caps = self.pattern.captures(text)?;
        let location = caps.get(1)?.as_str();
        let store = caps.get(2)?.as_str();
        Some(HeaderMatch {
            source: self.name.clone(),
            location_number: location.to_string(),
            store_name: clean_store_name(store),
        })
    }
}

/// The header chosen for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    /// Name of the rule that produced it.
    pub source: String,
    pub location_number: String,
    pub store_name: String,
}

/// Everything the rules found in one OCR text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMatches {
    /// Every route identifier, in text order.
    pub routes: Vec<String>,
    /// First match of the highest-priority header rule that matched.
    pub header: Option<HeaderMatch>,
}

impl PageMatches {
    pub fn has_routes(&self) -> bool {
        !self.routes.is_empty()
    }

    /// Pair every route with the page header.
    ///
    /// Without a header no records are produced. Routes or locations that
    /// don't satisfy the identifier formats are skipped with a warning.
    pub fn into_records(self, pdf: &str, page_number: u32) -> Vec<ExtractionRecord> {
        let Some(header) = self.header else {
            if self.has_routes() {
                debug!(
                    "Dropping {} route(s) on page {} of {}: no store header",
                    self.routes.len(),
                    page_number,
                    pdf
                );
            }
            return Vec::new();
        };

        let location_number = match LocationNumber::parse(&header.location_number) {
            Ok(loc) => loc,
            Err(e) => {
                warn!("Skipping page {} of {}: {}", page_number, pdf, e);
                return Vec::new();
            }
        };

        if self.routes.len() > 1 {
            debug!(
                "{} routes on page {} of {} share the {} header",
                self.routes.len(),
                page_number,
                pdf,
                header.source
            );
        }

        self.routes
            .iter()
            .filter_map(|route| match RouteId::parse(route) {
                Ok(route_id) => Some(ExtractionRecord {
                    route_id,
                    location_number: location_number.clone(),
                    store_name: header.store_name.clone(),
                    pdf: pdf.to_string(),
                    page_number,
                }),
                Err(e) => {
                    warn!("Skipping route on page {} of {}: {}", page_number, pdf, e);
                    None
                }
            })
            .collect()
    }
}

/// A route rule plus prioritized header rules.
#[derive(Debug, Clone)]
pub struct FieldRuleset {
    route: Regex,
    /// Sorted by descending priority.
    headers: Vec<HeaderRule>,
}

impl FieldRuleset {
    /// Create a ruleset. The route pattern's group 1 is the identifier.
    pub fn new(route: Regex, headers: Vec<HeaderRule>) -> Self {
        let mut ruleset = Self {
            route,
            headers: Vec::new(),
        };
        for rule in headers {
            ruleset = ruleset.with_header(rule);
        }
        ruleset
    }

    /// Add a header rule. Among equal priorities, earlier rules win.
    pub fn with_header(mut self, rule: HeaderRule) -> Self {
        let at = self
            .headers
            .iter()
            .position(|r| r.priority < rule.priority)
            .unwrap_or(self.headers.len());
        self.headers.insert(at, rule);
        self
    }

    pub fn headers(&self) -> &[HeaderRule] {
        &self.headers
    }

    /// Find routes and the winning header in `text`.
    pub fn apply(&self, text: &str) -> PageMatches {
        let routes = self
            .route
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect();

        let header = self.headers.iter().find_map(|rule| rule.first_match(text));

        PageMatches { routes, header }
    }
}

impl Default for FieldRuleset {
    /// Route numbers with "X-Dock WH" headers preferred over "To" headers.
    fn default() -> Self {
        Self::new(
            ROUTE_ID.clone(),
            vec![
                HeaderRule::new("X-Dock WH", XDOCK_WH_HEADER.clone(), 2),
                HeaderRule::new("To", TO_HEADER.clone(), 1),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_route_pattern_variants() {
        let rules = FieldRuleset::default();
        let found = rules.apply("Route: 12345678\nroute 87654321\nROUTE:11112222 Route 123456789");
        assert_eq!(found.routes, vec!["12345678", "87654321", "11112222"]);
    }

    #[test]
    fn test_clean_store_name() {
        assert_eq!(clean_store_name("Main Street Store Phone 555"), "Main Street Store");
        assert_eq!(clean_store_name("Depot\nPHONE"), "Depot");
        assert_eq!(clean_store_name("  Headphones Plus "), "Headphones Plus");
        assert_eq!(clean_store_name("Market\n"), "Market");
    }

    #[test]
    fn test_phone_suffix_after_capture() {
        let rules = FieldRuleset::default();
        let records = rules
            .apply("Route: 12345678\nX-Dock WH: 1234-Acme Store Phone: 555-1234")
            .into_records("a.pdf", 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].store_name, "Acme Store");
    }

    #[test]
    fn test_xdock_header_wins_regardless_of_order() {
        let rules = FieldRuleset::default();
        let text = "To 5 4321-Other Place\nRoute 12345678\nX-Dock WH: 1234-Depot";
        let header = rules.apply(text).header.unwrap();
        assert_eq!(header.source, "X-Dock WH");
        assert_eq!(header.location_number, "1234");
        assert_eq!(header.store_name, "Depot");
    }

    #[test]
    fn test_to_header_keeps_parentheses() {
        let rules = FieldRuleset::default();
        let header = rules.apply("To 12 0042-Springfield Market (North)").header.unwrap();
        assert_eq!(header.source, "To");
        assert_eq!(header.location_number, "0042");
        assert_eq!(header.store_name, "Springfield Market (North)");
    }

    #[test]
    fn test_first_match_of_rule_is_used() {
        let rules = FieldRuleset::default();
        let text = "To 1 1111-First;\nTo 2 2222-Second";
        let header = rules.apply(text).header.unwrap();
        assert_eq!(header.location_number, "1111");
        assert_eq!(header.store_name, "First");
    }

    #[test]
    fn test_one_record_per_route_mention() {
        let rules = FieldRuleset::default();
        let text = "Route: 12345678 Route: 12345678\nX-Dock WH: 1234-Depot";
        let records = rules.apply(text).into_records("a.pdf", 3);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], records[1]);
        assert_eq!(records[0].pdf, "a.pdf");
        assert_eq!(records[0].page_number, 3);
    }

    #[test]
    fn test_routes_without_header_are_dropped() {
        let rules = FieldRuleset::default();
        assert!(rules.apply("Route: 12345678").into_records("a.pdf", 1).is_empty());
    }

    #[test]
    fn test_custom_priorities() {
        let ruleset = FieldRuleset::default().with_header(HeaderRule::new(
            "Ship To",
            Regex::new(r"(?i)\bShip To\s*:\s*(\d{4})-([A-Za-z ]+)").unwrap(),
            3,
        ));
        let names: Vec<_> = ruleset.headers().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ship To", "X-Dock WH", "To"]);

        let text = "X-Dock WH: 1234-Depot\nShip To: 9999-Corner Shop";
        assert_eq!(ruleset.apply(text).header.unwrap().location_number, "9999");
    }
}
