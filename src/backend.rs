//! HTML backend abstraction for the extraction and crawl-control code

/// Trait representing an HTML element that can be queried with CSS selectors
///
/// Extraction only needs a handful of tree operations, so it is written
/// against this trait instead of a concrete parser.
pub trait HtmlNode {
    /// Select all descendant elements matching the CSS selector
    ///
    /// Returns an empty vector if no elements match or if the selector is invalid.
    fn select_all(&self, selector: &str) -> Vec<Self>
    where
        Self: Sized;

    /// Select the first descendant element matching the CSS selector
    fn select_one(&self, selector: &str) -> Option<Self>
    where
        Self: Sized,
    {
        self.select_all(selector).into_iter().next()
    }

    /// Get the text content of this element, including all descendants
    fn text(&self) -> String;

    /// Get the value of an HTML attribute
    fn attr(&self, name: &str) -> Option<&str>;

    /// Whether the element carries `class` among its classes
    fn has_class(&self, class: &str) -> bool;

    /// Direct child elements in document order (text nodes skipped)
    fn child_elements(&self) -> Vec<Self>
    where
        Self: Sized;

    /// The next sibling that is an element
    fn next_element(&self) -> Option<Self>
    where
        Self: Sized;
}

impl<'a> HtmlNode for scraper::ElementRef<'a> {
    fn select_all(&self, selector: &str) -> Vec<Self> {
        let selector = match scraper::Selector::parse(selector) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        self.select(&selector).collect()
    }

    fn select_one(&self, selector: &str) -> Option<Self> {
        let selector = scraper::Selector::parse(selector).ok()?;
        self.select(&selector).next()
    }

    fn text(&self) -> String {
        scraper::ElementRef::text(self).collect()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }

    fn has_class(&self, class: &str) -> bool {
        self.value().classes().any(|c| c == class)
    }

    fn child_elements(&self) -> Vec<Self> {
        self.children().filter_map(scraper::ElementRef::wrap).collect()
    }

    fn next_element(&self) -> Option<Self> {
        self.next_siblings().find_map(scraper::ElementRef::wrap)
    }
}
