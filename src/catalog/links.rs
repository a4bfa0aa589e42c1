//! What an index page tells us: listing links and the page count

use tracing::trace;
use url::Url;

use crate::HtmlNode;

/// Exact `class` attribute of anchors that point at a listing
pub const LISTING_LINK_CLASS: &str = "d-block text-ellipsis clp-big-value";

const PAGINATION_ANCHORS: &str = ".pagination.d-none.d-sm-flex a";
const LAST_PAGE_MARKER: &str = "Última";

/// Absolute URLs of every listing linked from an index page
///
/// Only anchors whose `class` attribute equals [`LISTING_LINK_CLASS`]
/// verbatim qualify. Relative hrefs are resolved against `page_url`.
pub fn listing_links<N: HtmlNode>(root: &N, page_url: &str) -> Vec<String> {
    let base = Url::parse(page_url).ok();

    root.select_all("a[href]")
        .iter()
        .filter(|anchor| anchor.attr("class") == Some(LISTING_LINK_CLASS))
        .filter_map(|anchor| {
            let href = anchor.attr("href")?;
            let resolved = match &base {
                Some(base) => base.join(href),
                None => Url::parse(href),
            };
            match resolved {
                Ok(url) => Some(url.to_string()),
                Err(e) => {
                    trace!(href, error = %e, "unresolvable listing link");
                    None
                }
            }
        })
        .collect()
}

/// Highest page number announced by the pagination widget's "last" anchors
///
/// Returns 0 when no such anchor exists, i.e. the catalog has a single page.
pub fn pagination_bound<N: HtmlNode>(root: &N) -> u32 {
    root.select_all(PAGINATION_ANCHORS)
        .iter()
        .filter(|anchor| anchor.text().trim().contains(LAST_PAGE_MARKER))
        .filter_map(|anchor| anchor.attr("href").and_then(page_number))
        .max()
        .unwrap_or(0)
}

/// Page number carried by the final path segment of `href`
fn page_number(href: &str) -> Option<u32> {
    href.rsplit('/').next()?.parse().ok()
}
