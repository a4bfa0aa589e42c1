//! Spreadsheet-friendly CSV output
//!
//! The file starts with a UTF-8 byte-order mark and uses `;` as separator,
//! which is what spreadsheet tools in comma-decimal locales expect.

use std::{fs::File, io::Write, path::Path};

use crate::{ExportError, Property};

const BOM: &[u8] = b"\xEF\xBB\xBF";
const DELIMITER: u8 = b';';

/// Column names, in output order
pub const HEADER: [&str; 13] = [
    "municipality",
    "sourceURL",
    "propertyType",
    "rooms",
    "bathrooms",
    "parkingSpaces",
    "totalArea",
    "builtArea",
    "valueUF",
    "valueCLP",
    "address",
    "seller",
    "broker",
];

/// Render one record as a row of [`HEADER`] columns
///
/// Areas and UF amounts keep two decimals; peso amounts are whole numbers.
pub fn to_row(record: &Property) -> [String; 13] {
    [
        record.municipality.clone(),
        record.source_url.clone(),
        record.property_type.clone(),
        record.rooms.to_string(),
        record.bathrooms.to_string(),
        record.parking_spaces.to_string(),
        format!("{:.2}", record.total_area),
        format!("{:.2}", record.built_area),
        format!("{:.2}", record.value_uf),
        format!("{:.0}", record.value_clp),
        record.address.clone(),
        record.seller.clone(),
        record.broker.clone(),
    ]
}

/// Write `records` as CSV to `writer`
pub fn write_csv<'a, W, I>(mut writer: W, records: I) -> Result<(), ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a Property>,
{
    writer.write_all(BOM)?;

    let mut csv = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(writer);

    csv.write_record(HEADER)?;
    for record in records {
        csv.write_record(to_row(record))?;
    }
    csv.flush()?;

    Ok(())
}

/// Create (or truncate) `path` and write `records` to it
pub fn save_csv<'a, P, I>(path: P, records: I) -> Result<(), ExportError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Property>,
{
    let file = File::create(path)?;
    write_csv(std::io::BufWriter::new(file), records)
}
