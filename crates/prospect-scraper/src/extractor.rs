//! Email address extraction from raw text and HTML.
//!
//! Addresses are collected from three places in a page: the visible text,
//! `mailto:` link targets and elements whose class mentions contact, team or
//! about sections. Everything returned is lowercase, valid and unique.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

static CANDIDATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid regex")
});

static VALID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

// The scheme is matched in `mailto_target`, case-insensitively.
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

static SECTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[class*="contact"], [class*="team"], [class*="about"]"#)
        .expect("valid selector")
});

/// Whether `email` looks like `local@domain.tld`.
///
/// Exactly one `@`, no whitespace, and at least one `.` after the `@` with
/// non-empty parts on both sides.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    VALID_REGEX.is_match(email)
}

/// Regex scan of plain text.
#[must_use]
pub fn extract_emails(text: &str) -> BTreeSet<String> {
    CANDIDATE_REGEX
        .find_iter(text)
        .filter_map(|m| normalize(m.as_str()))
        .collect()
}

/// Extract every address reachable from an HTML document.
///
/// Malformed markup is tolerated; the worst case is an empty set.
#[must_use]
pub fn extract_from_html(html: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);

    // Text nodes are concatenated without a separator.
    let visible_text = document.root_element().text().collect::<String>();
    let mut emails = extract_emails(&visible_text);

    for link in document.select(&LINK_SELECTOR) {
        if let Some(email) = link.value().attr("href").and_then(mailto_target) {
            emails.insert(email);
        }
    }

    for section in document.select(&SECTION_SELECTOR) {
        let text = section.text().collect::<String>();
        emails.extend(extract_emails(&text));
    }

    emails
}

/// Address part of a `mailto:` href, without the query string.
fn mailto_target(href: &str) -> Option<String> {
    const SCHEME: &str = "mailto:";
    href.get(..SCHEME.len())
        .filter(|scheme| scheme.eq_ignore_ascii_case(SCHEME))?;
    let address = href[SCHEME.len()..].split('?').next().unwrap_or_default();
    normalize(address)
}

fn normalize(candidate: &str) -> Option<String> {
    let email = candidate.trim().to_lowercase();
    is_valid_email(&email).then_some(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("jan@example.com"));
        assert!(is_valid_email("a.b+tag@sub.domain.pl"));
        assert!(!is_valid_email("jan@example"));
        assert!(!is_valid_email("jan@@example.com"));
        assert!(!is_valid_email("jan doe@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jan@.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_extract_emails_from_text() {
        let emails = extract_emails("Write to Jan@Example.com or anna@example.com, or JAN@example.COM.");
        assert_eq!(
            emails.into_iter().collect::<Vec<_>>(),
            vec!["anna@example.com", "jan@example.com"]
        );
    }

    #[test]
    fn test_extract_emails_ignores_noise() {
        assert!(extract_emails("no addresses here, just @ signs and user@host").is_empty());
        assert!(extract_emails("").is_empty());
    }

    #[test]
    fn test_extract_from_html_mailto_strips_query() {
        let html = r#"<html><body>
            <a href="mailto:Office@Firma.pl?subject=Hello">Napisz do nas</a>
            <a href="MAILTO:sales@firma.pl">Sales</a>
        </body></html>"#;

        let emails = extract_from_html(html);
        assert!(emails.contains("office@firma.pl"));
        assert!(emails.contains("sales@firma.pl"));
        assert_eq!(emails.len(), 2);
    }

    #[test]
    fn test_extract_from_html_ignores_other_links() {
        let html = r#"<a href="https://firma.pl/kontakt">kontakt</a><a href="tel:+48123">tel</a>"#;
        assert!(extract_from_html(html).is_empty());
    }

    #[test]
    fn test_extract_from_html_joins_inline_markup() {
        let html = r#"<html><body>
            <p>Napisz: jan@<b>firma.pl</b></p>
            <p>ola<span>@agencja.pl</span></p>
        </body></html>"#;

        let emails = extract_from_html(html);
        assert_eq!(
            emails.into_iter().collect::<Vec<_>>(),
            vec!["jan@firma.pl", "ola@agencja.pl"]
        );
    }

    #[test]
    fn test_extract_from_html_sections() {
        let html = r#"<html><body>
            <div class="footer-contact-box"><p>kontakt@agencja.pl</p></div>
            <section class="our-team"><span>ola@agencja.pl</span></section>
            <p>biuro@agencja.pl</p>
        </body></html>"#;

        let emails = extract_from_html(html);
        assert_eq!(
            emails.into_iter().collect::<Vec<_>>(),
            vec!["biuro@agencja.pl", "kontakt@agencja.pl", "ola@agencja.pl"]
        );
    }

    #[test]
    fn test_extract_from_html_dedupes_case_insensitively() {
        let html = r#"<p>Jan@Example.com</p>
            <a href="mailto:jan@example.com">jan@EXAMPLE.com</a>"#;
        let emails = extract_from_html(html);
        assert_eq!(emails.len(), 1);
        assert!(emails.contains("jan@example.com"));
    }

    #[test]
    fn test_extract_from_malformed_html() {
        let emails = extract_from_html("<div><p>unclosed <a href='mailto:'>x</a> <<<>>> \u{0}");
        assert!(emails.is_empty());
    }

    #[test]
    fn test_every_extracted_email_is_valid_and_lowercase() {
        let html = "<p>A@B.CO x.y@Z.org foo@bar baz@qux.io</p>";
        for email in extract_from_html(html) {
            assert!(is_valid_email(&email));
            assert_eq!(email, email.to_lowercase());
        }
    }
}
