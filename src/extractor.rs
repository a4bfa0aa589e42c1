//! Turning a listing page into a [`Property`]
//!
//! A listing page carries two regions of interest:
//!
//! - **Details tables** (`.clp-details-table`): a flat run of children, each
//!   tagged either `clp-description-label` or `clp-description-value`. A label
//!   names the field that the next value belongs to.
//! - **Contact box** (`.clp-publication-contact-box`): `h2.subtitle` headings,
//!   each followed by a table whose first cell holds a name.
//!
//! Label matching is exact, trailing colon and accents included. The page
//! text is the contract; a label that does not match is dropped.
//!
//! # Examples
//!
//! ```ignore
//! use listing_harvest::extractor::extract_listing;
//! use scraper::Html;
//!
//! let html = Html::parse_document(page);
//! let listing = extract_listing(&html.root_element(), "https://example.com/ad/1");
//! for issue in &listing.issues {
//!     tracing::warn!(%issue, "field skipped");
//! }
//! ```

use tracing::trace;

use crate::{
    FormatError, HtmlNode, StructureError,
    normalize::{parse_area, parse_integer, parse_money},
    property::{DIRECT_OWNER, Property},
};

const DETAILS_TABLE: &str = ".clp-details-table";
const LABEL_CLASS: &str = "clp-description-label";
const VALUE_CLASS: &str = "clp-description-value";
const CONTACT_BOX: &str = ".clp-publication-contact-box";
const CONTACT_HEADING: &str = "h2.subtitle";
const SELLER_HEADING: &str = "información de contacto";
const BROKER_HEADING: &str = "corredora";

/// Whether a details-table fragment names a field or carries its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Label,
    Value,
}

/// One tagged child of a details table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl Fragment {
    pub fn label(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Label,
            text: text.into(),
        }
    }

    pub fn value(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Value,
            text: text.into(),
        }
    }
}

/// Record field a label routes its value into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// `Valor:`; the currency comes from the value's prefix
    Price,
    PriceUf,
    PriceClp,
    Rooms,
    Bathrooms,
    ParkingSpaces,
    TotalArea,
    BuiltArea,
    ConstructionYear,
    Location,
    PropertyType,
}

/// Label text to field mapping, matched by exact string equality
pub const LABEL_TABLE: &[(&str, Field)] = &[
    ("Valor:", Field::Price),
    ("Valor (UF aprox.)*:", Field::PriceUf),
    ("Valor (CLP aprox.)*:", Field::PriceClp),
    ("Habitaciones:", Field::Rooms),
    ("Baño:", Field::Bathrooms),
    ("Baños:", Field::Bathrooms),
    ("Estacionamientos:", Field::ParkingSpaces),
    ("Superficie Total:", Field::TotalArea),
    ("Superficie Construida:", Field::BuiltArea),
    ("Año Construcción:", Field::ConstructionYear),
    ("Dirección:", Field::Location),
    ("Tipo de propiedad:", Field::PropertyType),
];

/// What happened when a value was routed into a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Stored,
    /// A `Valor:` value with neither a `$` nor a `UF` prefix
    Unattributed,
}

impl Field {
    /// Look up the field a label feeds, if any
    pub fn for_label(label: &str) -> Option<Field> {
        LABEL_TABLE
            .iter()
            .find(|(text, _)| *text == label)
            .map(|(_, field)| *field)
    }

    /// Parse `value` and store it on `property`
    ///
    /// On error the property is left untouched.
    pub fn apply(self, property: &mut Property, value: &str) -> Result<Assignment, FormatError> {
        match self {
            Field::Price => {
                if value.starts_with('$') {
                    property.value_clp = parse_money(value)?;
                } else if value.starts_with("UF") {
                    property.value_uf = parse_money(value)?;
                } else {
                    return Ok(Assignment::Unattributed);
                }
            }
            Field::PriceUf => property.value_uf = parse_money(value)?,
            Field::PriceClp => property.value_clp = parse_money(value)?,
            Field::Rooms => property.rooms = parse_integer(value)?,
            Field::Bathrooms => property.bathrooms = parse_integer(value)?,
            Field::ParkingSpaces => property.parking_spaces = parse_integer(value)?,
            Field::TotalArea => property.total_area = parse_area(value)?,
            Field::BuiltArea => property.built_area = parse_area(value)?,
            Field::ConstructionYear => property.construction_year = parse_integer(value)?,
            Field::Location => property.set_location(value),
            Field::PropertyType => property.property_type = value.to_string(),
        }
        Ok(Assignment::Stored)
    }
}

/// A field that could not be filled, recorded instead of aborting the record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldIssue {
    /// The value under `label` did not parse; the field keeps its default
    #[error("value '{value}' under '{label}' is malformed: {error}")]
    Malformed {
        label: String,
        value: String,
        error: FormatError,
    },

    /// A `Valor:` whose currency could not be told
    #[error("value '{value}' under 'Valor:' has no known currency prefix")]
    Unattributed { value: String },

    #[error(transparent)]
    Structure(#[from] StructureError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LatchState {
    Idle,
    AwaitingValue(String),
}

/// Two-state machine pairing each label with the value that follows it
///
/// A label arms the latch, overwriting any label still waiting. A value
/// fires it and returns it to idle. Values arriving while idle are dropped.
#[derive(Debug)]
pub struct DetailsLatch {
    state: LatchState,
    property: Property,
    issues: Vec<FieldIssue>,
}

impl DetailsLatch {
    pub fn new(property: Property) -> Self {
        Self {
            state: LatchState::Idle,
            property,
            issues: Vec::new(),
        }
    }

    /// Whether a label is waiting for its value
    pub fn is_awaiting_value(&self) -> bool {
        matches!(self.state, LatchState::AwaitingValue(_))
    }

    pub fn feed(&mut self, fragment: &Fragment) {
        let text = fragment.text.trim();
        match fragment.kind {
            FragmentKind::Label => {
                self.state = LatchState::AwaitingValue(text.to_string());
            }
            FragmentKind::Value => {
                match std::mem::replace(&mut self.state, LatchState::Idle) {
                    LatchState::AwaitingValue(label) => self.dispatch(label, text),
                    LatchState::Idle => trace!(value = text, "value without a label"),
                }
            }
        }
    }

    fn dispatch(&mut self, label: String, value: &str) {
        let Some(field) = Field::for_label(&label) else {
            trace!(label = %label, "ignoring unmapped label");
            return;
        };

        match field.apply(&mut self.property, value) {
            Ok(Assignment::Stored) => {}
            Ok(Assignment::Unattributed) => self.issues.push(FieldIssue::Unattributed {
                value: value.to_string(),
            }),
            Err(error) => self.issues.push(FieldIssue::Malformed {
                label,
                value: value.to_string(),
                error,
            }),
        }
    }

    pub fn finish(self) -> (Property, Vec<FieldIssue>) {
        (self.property, self.issues)
    }
}

/// A listing record together with what could not be read from its page
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedListing {
    pub property: Property,
    pub issues: Vec<FieldIssue>,
}

impl ExtractedListing {
    /// Number of `Valor:` values whose currency was not recognized
    pub fn unattributed_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| matches!(issue, FieldIssue::Unattributed { .. }))
            .count()
    }
}

/// Collect the label/value fragments of every details table, in document order
pub fn detail_fragments<N: HtmlNode>(root: &N) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    for table in root.select_all(DETAILS_TABLE) {
        for child in table.child_elements() {
            if child.has_class(LABEL_CLASS) {
                fragments.push(Fragment::label(child.text()));
            } else if child.has_class(VALUE_CLASS) {
                fragments.push(Fragment::value(child.text()));
            }
        }
    }
    fragments
}

/// Run `fragments` through a [`DetailsLatch`] seeded with `property`
pub fn apply_fragments<'a, I>(property: Property, fragments: I) -> (Property, Vec<FieldIssue>)
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let mut latch = DetailsLatch::new(property);
    for fragment in fragments {
        latch.feed(fragment);
    }
    latch.finish()
}

/// Read seller and broker names from the contact box
///
/// When no broker name is found the broker becomes [`DIRECT_OWNER`].
pub fn read_contact_box<N: HtmlNode>(root: &N, property: &mut Property) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    for contact_box in root.select_all(CONTACT_BOX) {
        for heading in contact_box.select_all(CONTACT_HEADING) {
            let title = heading.text().trim().to_lowercase();
            let slot = match title.as_str() {
                SELLER_HEADING => &mut property.seller,
                BROKER_HEADING => &mut property.broker,
                _ => continue,
            };

            match first_cell(&heading, &title) {
                Ok(name) if !name.is_empty() => *slot = name,
                Ok(_) => {}
                Err(error) => issues.push(error.into()),
            }
        }
    }

    if property.broker.is_empty() {
        property.broker = DIRECT_OWNER.to_string();
    }

    issues
}

fn first_cell<N: HtmlNode>(heading: &N, title: &str) -> Result<String, StructureError> {
    let table = heading
        .next_element()
        .ok_or_else(|| StructureError::MissingTable {
            heading: title.to_string(),
        })?;

    table
        .select_one("tr")
        .and_then(|row| row.select_one("td"))
        .map(|cell| cell.text().trim().to_string())
        .ok_or_else(|| StructureError::MissingRow {
            heading: title.to_string(),
        })
}

/// Extract the full record for the listing page rooted at `root`
pub fn extract_listing<N: HtmlNode>(root: &N, source_url: &str) -> ExtractedListing {
    let fragments = detail_fragments(root);
    let (mut property, mut issues) = apply_fragments(Property::new(source_url), &fragments);
    issues.extend(read_contact_box(root, &mut property));

    ExtractedListing { property, issues }
}
