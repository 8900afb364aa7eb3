use scraper::{ElementRef, Html};

/// Collect the `href` of every anchor in document order.
///
/// Empty and whitespace-only values are dropped; fragment-only references
/// (`#top`) are kept so the caller can report them.
pub fn anchor_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name().eq_ignore_ascii_case("a"))
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_fragment_only(href: &str) -> bool {
    href.starts_with('#')
}
