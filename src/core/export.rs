use crate::domain::model::{Dataset, ListingRecord, PriceExtremes, ReportData, YearlyStats};
use crate::utils::error::Result;
use chrono::{DateTime, Local};
use serde::Serialize;

/// Exported column order; matches the field order of [`ListingRecord`].
pub const CSV_COLUMNS: [&str; 7] = [
    "brand",
    "model",
    "year",
    "price_eur",
    "km",
    "location",
    "source_url",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// UTF-8 CSV with a byte-order mark so spreadsheet apps pick the right
/// encoding. The header row is written even for an empty dataset.
pub fn csv_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut buffer);
        writer.write_record(CSV_COLUMNS)?;
        for record in dataset.records() {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    search_url: &'a str,
    record_count: usize,
    listings: &'a [ListingRecord],
    yearly_stats: &'a [YearlyStats],
    extremes: Option<&'a PriceExtremes>,
}

pub fn json_bytes(
    data: &ReportData,
    search_url: &str,
    generated_at: DateTime<Local>,
) -> Result<Vec<u8>> {
    let report = JsonReport {
        generated_at: generated_at.to_rfc3339(),
        search_url,
        record_count: data.dataset.len(),
        listings: data.dataset.records(),
        yearly_stats: &data.yearly_stats,
        extremes: data.extremes.as_ref(),
    };
    Ok(serde_json::to_vec_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::{build_dataset, price_extremes, yearly_stats};
    use crate::domain::model::YearSource;

    fn sample() -> Dataset {
        build_dataset(vec![
            ListingRecord {
                brand: "Honda".to_string(),
                model: "CBR 650 R".to_string(),
                year: 2019,
                price_eur: 12500,
                km: Some(8200),
                location: Some("Milano (MI)".to_string()),
                source_url: "https://www.moto.it/annuncio/1".to_string(),
                year_source: YearSource::Card,
            },
            ListingRecord {
                brand: "Honda".to_string(),
                model: "CBR 650 R".to_string(),
                year: 2018,
                price_eur: 6900,
                km: None,
                location: None,
                source_url: "https://www.moto.it/annuncio/2".to_string(),
                year_source: YearSource::Detail,
            },
        ])
    }

    #[test]
    fn test_csv_has_bom_header_and_empty_optionals() {
        let bytes = csv_bytes(&sample()).unwrap();

        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "brand,model,year,price_eur,km,location,source_url");
        assert_eq!(
            lines[1],
            "Honda,CBR 650 R,2018,6900,,,https://www.moto.it/annuncio/2"
        );
        assert_eq!(
            lines[2],
            "Honda,CBR 650 R,2019,12500,8200,Milano (MI),https://www.moto.it/annuncio/1"
        );
    }

    #[test]
    fn test_csv_for_empty_dataset_is_header_only() {
        let bytes = csv_bytes(&Dataset::default()).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text.trim_end(), CSV_COLUMNS.join(","));
    }

    #[test]
    fn test_csv_reads_back_into_records() {
        let bytes = csv_bytes(&sample()).unwrap();
        let mut reader = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
        let records: Vec<ListingRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].km, None);
        assert_eq!(records[1].location.as_deref(), Some("Milano (MI)"));
    }

    #[test]
    fn test_json_report_contents() {
        let dataset = sample();
        let stats = yearly_stats(&dataset);
        let data = ReportData {
            extremes: price_extremes(&stats),
            yearly_stats: stats,
            dataset,
        };

        let bytes = json_bytes(&data, "https://www.moto.it/moto-usate/honda/cbr-650-r", Local::now())
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["record_count"], 2);
        assert_eq!(value["listings"][0]["year"], 2018);
        assert!(value["listings"][0]["km"].is_null());
        assert!(value["listings"][0].get("year_source").is_none());
        assert_eq!(value["yearly_stats"][1]["median"], 12500.0);
        assert_eq!(value["extremes"]["priciest_year"], 2019);
    }
}
