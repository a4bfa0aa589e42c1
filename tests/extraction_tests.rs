use listing_harvest::extractor::{
    Field, Fragment, apply_fragments, detail_fragments, read_contact_box,
};
use listing_harvest::{DIRECT_OWNER, FieldIssue, Property, StructureError, extract_listing, split_location};
use scraper::Html;

const LISTING_PAGE: &str = r#"
<html><body>
  <div class="clp-details-table">
    <div class="clp-description-label">Valor:</div>
    <div class="clp-description-value">UF 8.900</div>
    <div class="clp-description-label">Valor (CLP aprox.)*:</div>
    <div class="clp-description-value">$ 331.557.000</div>
    <div class="clp-description-label">Tipo de propiedad:</div>
    <div class="clp-description-value"> Casa </div>
    <div class="clp-description-label">Dirección:</div>
    <div class="clp-description-value">Las Condes, Av. Apoquindo 1234, Depto 5</div>
  </div>
  <div class="clp-details-table">
    <span class="clp-description-label">Habitaciones:</span>
    <span class="clp-description-value">4</span>
    <span class="clp-description-label">Baños:</span>
    <span class="clp-description-value">3</span>
    <span class="clp-description-label">Estacionamientos:</span>
    <span class="clp-description-value">2</span>
    <span class="clp-description-label">Superficie Total:</span>
    <span class="clp-description-value">450,5 m²</span>
    <span class="clp-description-label">Superficie Construida:</span>
    <span class="clp-description-value">210 m²</span>
    <span class="clp-description-label">Año Construcción:</span>
    <span class="clp-description-value">1.998</span>
    <span class="clp-description-label">Gastos comunes:</span>
    <span class="clp-description-value">$ 120.000</span>
  </div>
  <div class="clp-publication-contact-box">
    <h2 class="subtitle">Información de contacto</h2>
    <table><tr><td> María Pérez </td><td>+56 9 1234 5678</td></tr></table>
    <h2 class="subtitle">Corredora</h2>
    <table><tr><td>Propiedades del Sur Ltda.</td></tr></table>
  </div>
</body></html>
"#;

fn extract(html: &str) -> listing_harvest::ExtractedListing {
    let document = Html::parse_document(html);
    extract_listing(&document.root_element(), "https://example.com/ad/1")
}

#[cfg(test)]
mod state_machine_tests {
    use super::*;

    #[test]
    fn test_two_label_value_pairs() {
        let fragments = vec![
            Fragment::label("Habitaciones:"),
            Fragment::value("2"),
            Fragment::label("Baños:"),
            Fragment::value("1"),
        ];

        let (property, issues) = apply_fragments(Property::default(), &fragments);

        assert!(issues.is_empty());
        assert_eq!(property.rooms, 2);
        assert_eq!(property.bathrooms, 1);
        assert_eq!(property.parking_spaces, 0);
        assert_eq!(property.construction_year, 0);
        assert_eq!(property.total_area, 0.0);
        assert_eq!(property.built_area, 0.0);
        assert_eq!(property.value_clp, 0.0);
        assert_eq!(property.value_uf, 0.0);
    }

    #[test]
    fn test_singular_bathroom_label() {
        let fragments = vec![Fragment::label("Baño:"), Fragment::value("1")];
        let (property, _) = apply_fragments(Property::default(), &fragments);
        assert_eq!(property.bathrooms, 1);
    }

    #[test]
    fn test_latest_label_wins() {
        let fragments = vec![
            Fragment::label("Habitaciones:"),
            Fragment::label("Estacionamientos:"),
            Fragment::value("3"),
        ];

        let (property, _) = apply_fragments(Property::default(), &fragments);

        assert_eq!(property.rooms, 0);
        assert_eq!(property.parking_spaces, 3);
    }

    #[test]
    fn test_each_label_consumes_one_value() {
        // a repeated value does not reach the field a second time
        let fragments = vec![
            Fragment::label("Habitaciones:"),
            Fragment::value("4"),
            Fragment::value("9"),
            Fragment::label("Valor:"),
            Fragment::value("UF 3.000"),
            Fragment::value("$ 99.000.000"),
        ];

        let (property, issues) = apply_fragments(Property::default(), &fragments);

        assert!(issues.is_empty());
        assert_eq!(property.rooms, 4);
        assert_eq!(property.value_uf, 3000.0);
        assert_eq!(property.value_clp, 0.0);
    }

    #[test]
    fn test_value_before_any_label_is_dropped() {
        let fragments = vec![
            Fragment::value("7"),
            Fragment::label("Baños:"),
            Fragment::value("2"),
        ];

        let (property, issues) = apply_fragments(Property::default(), &fragments);

        assert!(issues.is_empty());
        assert_eq!(property.rooms, 0);
        assert_eq!(property.bathrooms, 2);
    }

    #[test]
    fn test_label_without_value_leaves_default() {
        let fragments = vec![
            Fragment::label("Habitaciones:"),
            Fragment::label("Baños:"),
            Fragment::value("2"),
            Fragment::label("Año Construcción:"),
        ];

        let (property, issues) = apply_fragments(Property::default(), &fragments);

        assert!(issues.is_empty());
        assert_eq!(property.rooms, 0);
        assert_eq!(property.bathrooms, 2);
        assert_eq!(property.construction_year, 0);
    }

    #[test]
    fn test_label_and_value_text_is_trimmed() {
        let fragments = vec![Fragment::label("  Habitaciones:\n"), Fragment::value("\t5 ")];
        let (property, _) = apply_fragments(Property::default(), &fragments);
        assert_eq!(property.rooms, 5);
    }

    #[test]
    fn test_unknown_label_is_ignored() {
        let fragments = vec![
            Fragment::label("Orientación:"),
            Fragment::value("Norte"),
            Fragment::label("Habitaciones:"),
            Fragment::value("3"),
        ];

        let (property, issues) = apply_fragments(Property::default(), &fragments);

        assert!(issues.is_empty());
        assert_eq!(property.rooms, 3);
        assert_eq!(property.property_type, "");
    }

    #[test]
    fn test_valor_routes_by_prefix() {
        let pesos = vec![Fragment::label("Valor:"), Fragment::value("$ 95.000.000")];
        let (property, _) = apply_fragments(Property::default(), &pesos);
        assert_eq!(property.value_clp, 95_000_000.0);
        assert_eq!(property.value_uf, 0.0);

        let uf = vec![Fragment::label("Valor:"), Fragment::value("UF 4.200,5")];
        let (property, _) = apply_fragments(Property::default(), &uf);
        assert_eq!(property.value_uf, 4200.5);
        assert_eq!(property.value_clp, 0.0);
    }

    #[test]
    fn test_valor_without_currency_is_reported() {
        let fragments = vec![Fragment::label("Valor:"), Fragment::value("Consultar")];

        let (property, issues) = apply_fragments(Property::default(), &fragments);

        assert_eq!(property.value_clp, 0.0);
        assert_eq!(property.value_uf, 0.0);
        assert_eq!(
            issues,
            vec![FieldIssue::Unattributed {
                value: "Consultar".to_string()
            }]
        );
    }

    #[test]
    fn test_malformed_value_skips_only_that_field() {
        let fragments = vec![
            Fragment::label("Habitaciones:"),
            Fragment::value("tres"),
            Fragment::label("Baños:"),
            Fragment::value("2"),
        ];

        let (property, issues) = apply_fragments(Property::default(), &fragments);

        assert_eq!(property.rooms, 0);
        assert_eq!(property.bathrooms, 2);
        assert_eq!(issues.len(), 1);
        match &issues[0] {
            FieldIssue::Malformed { label, value, .. } => {
                assert_eq!(label, "Habitaciones:");
                assert_eq!(value, "tres");
            }
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_mapping_table_lookups() {
        assert_eq!(Field::for_label("Valor (UF aprox.)*:"), Some(Field::PriceUf));
        assert_eq!(Field::for_label("Valor (CLP aprox.)*:"), Some(Field::PriceClp));
        assert_eq!(Field::for_label("Dirección:"), Some(Field::Location));
        assert_eq!(Field::for_label("Direccion:"), None);
    }
}

#[cfg(test)]
mod location_tests {
    use super::*;

    #[test]
    fn test_split_on_first_comma() {
        let (municipality, address) = split_location("Las Condes, Av. Apoquindo 1234");
        assert_eq!(municipality, "Las Condes");
        assert_eq!(address, "Av. Apoquindo 1234");
    }

    #[test]
    fn test_no_comma() {
        let (municipality, address) = split_location("Providencia");
        assert_eq!(municipality, "Providencia");
        assert_eq!(address, "");
    }

    #[test]
    fn test_remaining_commas_kept_in_address() {
        let (municipality, address) = split_location("Ñuñoa,Los Alerces 10, casa 2");
        assert_eq!(municipality, "Ñuñoa");
        assert_eq!(address, "Los Alerces 10, casa 2");
    }
}

#[cfg(test)]
mod document_tests {
    use super::*;

    #[test]
    fn test_fragments_follow_document_order() {
        let document = Html::parse_document(LISTING_PAGE);
        let fragments = detail_fragments(&document.root_element());

        assert_eq!(fragments.len(), 22);
        assert_eq!(fragments[0], Fragment::label("Valor:"));
        assert_eq!(fragments[1], Fragment::value("UF 8.900"));
        assert_eq!(fragments[8], Fragment::label("Habitaciones:"));
    }

    #[test]
    fn test_full_listing() {
        let listing = extract(LISTING_PAGE);
        let p = &listing.property;

        assert!(listing.issues.is_empty(), "{:?}", listing.issues);
        assert_eq!(p.source_url, "https://example.com/ad/1");
        assert_eq!(p.value_uf, 8900.0);
        assert_eq!(p.value_clp, 331_557_000.0);
        assert_eq!(p.property_type, "Casa");
        assert_eq!(p.municipality, "Las Condes");
        assert_eq!(p.address, "Av. Apoquindo 1234, Depto 5");
        assert_eq!(p.rooms, 4);
        assert_eq!(p.bathrooms, 3);
        assert_eq!(p.parking_spaces, 2);
        assert_eq!(p.total_area, 450.5);
        assert_eq!(p.built_area, 210.0);
        assert_eq!(p.construction_year, 1998);
        assert_eq!(p.seller, "María Pérez");
        assert_eq!(p.broker, "Propiedades del Sur Ltda.");
    }

    #[test]
    fn test_children_without_marker_classes_are_skipped() {
        let listing = extract(
            r#"
            <div class="clp-details-table">
                <div class="clp-description-label">Habitaciones:</div>
                <div class="separator">9</div>
                <div class="clp-description-value">2</div>
            </div>
        "#,
        );

        assert_eq!(listing.property.rooms, 2);
    }

    #[test]
    fn test_no_broker_block_means_direct_owner() {
        let listing = extract(
            r#"
            <div class="clp-publication-contact-box">
                <h2 class="subtitle">Información de contacto</h2>
                <table><tr><td>Juan Soto</td></tr></table>
            </div>
        "#,
        );

        assert_eq!(listing.property.seller, "Juan Soto");
        assert_eq!(listing.property.broker, DIRECT_OWNER);
        assert_eq!(listing.property.broker, "direct owner");
    }

    #[test]
    fn test_page_without_contact_box_means_direct_owner() {
        let listing = extract("<html><body><p>nothing here</p></body></html>");

        assert_eq!(listing.property.seller, "");
        assert_eq!(listing.property.broker, DIRECT_OWNER);
        assert!(listing.issues.is_empty());
    }

    #[test]
    fn test_empty_broker_name_means_direct_owner() {
        let listing = extract(
            r#"
            <div class="clp-publication-contact-box">
                <h2 class="subtitle">  CORREDORA </h2>
                <table><tr><td>   </td></tr></table>
            </div>
        "#,
        );

        assert_eq!(listing.property.broker, DIRECT_OWNER);
        assert!(listing.issues.is_empty());
    }

    #[test]
    fn test_heading_match_ignores_case() {
        let document = Html::parse_document(
            r#"
            <div class="clp-publication-contact-box">
                <h2 class="subtitle">INFORMACIÓN DE CONTACTO</h2>
                <table><tr><td>Ana</td></tr></table>
            </div>
        "#,
        );
        let mut property = Property::default();

        read_contact_box(&document.root_element(), &mut property);

        assert_eq!(property.seller, "Ana");
    }

    #[test]
    fn test_heading_without_table_is_a_structure_issue() {
        let listing = extract(
            r#"
            <div class="clp-publication-contact-box">
                <h2 class="subtitle">Corredora</h2>
            </div>
        "#,
        );

        assert_eq!(listing.property.broker, DIRECT_OWNER);
        assert_eq!(
            listing.issues,
            vec![FieldIssue::Structure(StructureError::MissingTable {
                heading: "corredora".to_string()
            })]
        );
    }

    #[test]
    fn test_table_without_cells_is_a_structure_issue() {
        let listing = extract(
            r#"
            <div class="clp-publication-contact-box">
                <h2 class="subtitle">Información de contacto</h2>
                <div class="empty"></div>
            </div>
        "#,
        );

        assert_eq!(
            listing.issues,
            vec![FieldIssue::Structure(StructureError::MissingRow {
                heading: "información de contacto".to_string()
            })]
        );
    }

    #[test]
    fn test_unattributed_count() {
        let listing = extract(
            r#"
            <div class="clp-details-table">
                <div class="clp-description-label">Valor:</div>
                <div class="clp-description-value">A convenir</div>
            </div>
        "#,
        );

        assert_eq!(listing.unattributed_count(), 1);
    }
}
