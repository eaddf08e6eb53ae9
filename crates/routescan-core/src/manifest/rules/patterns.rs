//! Regex patterns for delivery manifest fields.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Route identifier, e.g. "Route: 12345678" or "ROUTE12345678"
    pub static ref ROUTE_ID: Regex = Regex::new(
        r"(?i)\bRoute[:\s]*:?(\d{8})\b"
    ).unwrap();

    // Destination header, e.g. "To 12 0042-Springfield Market (North)"
    pub static ref TO_HEADER: Regex = Regex::new(
        r"(?i)\bTo\s+\d+\s+(\d{4})-([A-Za-z0-9\s\(\)]+)"
    ).unwrap();

    // Cross-dock warehouse header, e.g. "X-Dock WH: 0042-Springfield DC"
    pub static ref XDOCK_WH_HEADER: Regex = Regex::new(
        r"(?i)\bX-Dock WH\s*:\s*(\d{4})-([A-Za-z0-9\s]+)"
    ).unwrap();

    // Start of a trailing phone field in a store name
    pub static ref PHONE_SUFFIX: Regex = Regex::new(
        r"(?i)\sphone"
    ).unwrap();
}
