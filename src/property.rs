//! The record produced for every listing page

/// Broker value used when a listing names no intermediary
pub const DIRECT_OWNER: &str = "direct owner";

/// One property for sale, as read from its listing page
///
/// Numeric fields stay at zero when the listing does not publish them. At
/// most one of `value_clp`/`value_uf` is normally set, depending on the
/// currency the listing quotes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Property {
    pub value_clp: f64,
    pub value_uf: f64,
    pub rooms: u32,
    pub bathrooms: u32,
    pub parking_spaces: u32,
    /// Square meters
    pub total_area: f64,
    /// Square meters
    pub built_area: f64,
    pub construction_year: u32,
    pub municipality: String,
    pub address: String,
    pub source_url: String,
    pub property_type: String,
    pub seller: String,
    pub broker: String,
}

impl Property {
    /// Create an empty record for the listing at `source_url`
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    /// Fill `municipality` and `address` from a `"Comuna, street"` location
    pub fn set_location(&mut self, location: &str) {
        let (municipality, address) = split_location(location);
        self.municipality = municipality;
        self.address = address;
    }
}

/// Split a location on its first comma
///
/// The first segment is the municipality and the rest, commas included, is
/// the street address. Without a comma the whole text is the municipality.
///
/// ```ignore
/// let (m, a) = split_location("Las Condes, Av. Apoquindo 1234");
/// assert_eq!((m.as_str(), a.as_str()), ("Las Condes", "Av. Apoquindo 1234"));
/// ```
pub fn split_location(location: &str) -> (String, String) {
    match location.split_once(',') {
        Some((municipality, address)) => {
            (municipality.trim().to_string(), address.trim().to_string())
        }
        None => (location.trim().to_string(), String::new()),
    }
}
