//! Integration tests for configuration validation and parsing

use kinfin_client::session::TaxonRecord;
use kinfin_client::validate::{parse_taxon_table, validate_config};

#[test]
fn test_valid_config_passes() {
    let records = vec![
        TaxonRecord::new("GCA_000001", "nematoda", "plant"),
        TaxonRecord::new("GCA_000002", "nematoda", "animal"),
    ];
    let report = validate_config(&records);
    assert!(report.is_ok(), "unexpected issues: {report}");
}

#[test]
fn test_empty_config_is_rejected() {
    let report = validate_config(&[]);
    assert!(!report.is_ok());
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].row, None);
}

#[test]
fn test_empty_fields_reported_per_record() {
    let records = vec![
        TaxonRecord::new("GCA_000001", "nematoda", "plant"),
        TaxonRecord::new("", "nematoda", ""),
        TaxonRecord::new("GCA_000003", "  ", "plant"),
    ];
    let report = validate_config(&records);

    let rows: Vec<Option<usize>> = report.issues.iter().map(|i| i.row).collect();
    assert_eq!(rows, vec![Some(2), Some(2), Some(3)]);
    assert!(report.issues[0].message.contains("taxon id"));
    assert!(report.issues[1].message.contains("host group"));
    assert!(report.issues[2].message.contains("clade"));
}

#[test]
fn test_duplicate_taxon_ids_reported() {
    let records = vec![
        TaxonRecord::new("GCA_000001", "nematoda", "plant"),
        TaxonRecord::new("GCA_000001", "outgroup", "animal"),
    ];
    let report = validate_config(&records);

    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].row, Some(2));
    assert!(report.issues[0].message.contains("duplicate"));
}

#[test]
fn test_parse_tab_separated_table() -> anyhow::Result<()> {
    let content = "GCA_000001\tnematoda\tplant\nGCA_000002\tnematoda\tanimal\n";
    let records = parse_taxon_table(content)?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0], TaxonRecord::new("GCA_000001", "nematoda", "plant"));
    Ok(())
}

#[test]
fn test_parse_comma_separated_with_header_and_comments() -> anyhow::Result<()> {
    let content = "\
taxon_id,clade,host_group
# free-living outgroup below
GCA_000001,nematoda,plant
GCA_000003,outgroup,free_living
";
    let records = parse_taxon_table(content)?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].clade, "outgroup");
    Ok(())
}

#[test]
fn test_parse_skips_header_preceded_by_comments_and_blanks() -> anyhow::Result<()> {
    let content = "\
# exported from the dashboard

taxon_id\tclade\thost_group
GCA_000001\tnematoda\tplant
";
    let records = parse_taxon_table(content)?;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].taxon_id, "GCA_000001");
    Ok(())
}

#[test]
fn test_parse_keeps_header_like_line_after_data() -> anyhow::Result<()> {
    // only the first line of data may be a header
    let content = "GCA_000001,nematoda,plant\ntaxon_id,clade,host_group\n";
    let records = parse_taxon_table(content)?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].taxon_id, "taxon_id");
    Ok(())
}

#[test]
fn test_parse_rejects_wrong_field_count() {
    let result = parse_taxon_table("GCA_000001,nematoda\n");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("expected 3 fields"));
}

#[test]
fn test_parse_preserves_record_order() -> anyhow::Result<()> {
    let content = "c,x,y\na,x,y\nb,x,y\n";
    let records = parse_taxon_table(content)?;
    let ids: Vec<&str> = records.iter().map(|r| r.taxon_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
    Ok(())
}
