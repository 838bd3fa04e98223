//! Self-contained HTML report: run header, charts, per-year table, listings.
//!
//! Charts are drawn client-side by Plotly loaded from its CDN; the page has
//! no other external dependency.

use crate::domain::model::ReportData;
use crate::utils::error::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// What the report says about the run that produced it.
#[derive(Debug, Clone)]
pub struct ReportHeader {
    pub search_label: String,
    pub search_url: String,
    pub generated_at: DateTime<Local>,
}

impl ReportHeader {
    pub fn new(brand: &str, model: &str, search_url: &str) -> Self {
        Self {
            search_label: format!("{} {}", brand, model).trim().to_string(),
            search_url: search_url.to_string(),
            generated_at: Local::now(),
        }
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Serialize)]
struct ChartData {
    scatter_x: Vec<i32>,
    scatter_y: Vec<u64>,
    mean_x: Vec<i32>,
    mean_y: Vec<f64>,
}

impl ChartData {
    fn from_report(data: &ReportData) -> Self {
        let records = data.dataset.records();
        Self {
            scatter_x: records.iter().map(|r| r.year).collect(),
            scatter_y: records.iter().map(|r| r.price_eur).collect(),
            mean_x: data.yearly_stats.iter().map(|s| s.year).collect(),
            mean_y: data.yearly_stats.iter().map(|s| s.mean.round()).collect(),
        }
    }
}

fn stats_rows(data: &ReportData) -> String {
    let mut rows = String::new();
    for s in &data.yearly_stats {
        let _ = writeln!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{:.0}</td><td>{:.0}</td><td>{}</td><td>{}</td></tr>",
            s.year,
            s.count,
            s.mean.round(),
            s.median.round(),
            s.min,
            s.max
        );
    }
    rows
}

fn listing_rows(data: &ReportData) -> String {
    let mut rows = String::new();
    for r in data.dataset.records() {
        let km = r.km.map(|k| k.to_string()).unwrap_or_default();
        let location = r.location.as_deref().map(escape_html).unwrap_or_default();
        let link = if r.source_url.is_empty() {
            String::new()
        } else {
            format!(
                r#"<a href="{}" target="_blank" rel="noopener">apri</a>"#,
                escape_html(&r.source_url)
            )
        };
        let _ = writeln!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            r.year, r.price_eur, km, location, link
        );
    }
    rows
}

fn extremes_block(data: &ReportData) -> String {
    match &data.extremes {
        Some(e) => format!(
            r#"<div class="extremes">
  <div><span class="muted">Anno medio più economico</span><b>{}</b><span class="muted">€{}</span></div>
  <div><span class="muted">Anno medio più costoso</span><b>{}</b><span class="muted">€{}</span></div>
</div>"#,
            e.cheapest_year, e.cheapest_mean, e.priciest_year, e.priciest_mean
        ),
        None => r#"<p class="muted">Nessun annuncio.</p>"#.to_string(),
    }
}

pub fn render_html(data: &ReportData, header: &ReportHeader) -> Result<String> {
    // `</` inside a <script> block would end it early
    let charts = serde_json::to_string(&ChartData::from_report(data))?.replace("</", "<\\/");
    let url = escape_html(&header.search_url);

    Ok(format!(
        r#"<!doctype html>
<html lang="it">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Report {label}: prezzo vs anno</title>
<script src="{plotly}"></script>
<style>
body {{ font-family: system-ui, sans-serif; margin: 20px; background: #f8f9fa; color: #212529; }}
.card {{ background: #fff; border: 1px solid #eee; border-radius: 12px; padding: 16px; margin-bottom: 20px; }}
.muted {{ color: #6c757d; }}
.extremes {{ display: flex; gap: 16px; }}
.extremes div {{ flex: 1; display: flex; flex-direction: column; align-items: center; border: 1px solid #dee2e6; border-radius: 8px; padding: 8px; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ text-align: left; padding: 4px 8px; border-bottom: 1px solid #eee; }}
</style>
</head>
<body>
<h2>Usato: prezzo vs anno</h2>
<p class="muted">Ricerca: <b>{label}</b> &bull; URL: <a href="{url}" target="_blank" rel="noopener">{url}</a> &bull; Annunci: <b>{count}</b> &bull; Generato: {generated}</p>

<div class="card"><h3>Prezzo vs anno</h3><div id="scatter"></div></div>
<div class="card"><h3>Prezzo medio per anno</h3><div id="mean-line"></div>
{extremes}
</div>

<div class="card">
<h3>Statistiche per anno</h3>
<table id="stats-table">
<thead><tr><th>Anno</th><th>#</th><th>Media €</th><th>Mediana €</th><th>Min €</th><th>Max €</th></tr></thead>
<tbody>
{stats_rows}</tbody>
</table>
</div>

<div class="card">
<h3>Annunci</h3>
<table id="ads-table">
<thead><tr><th>Anno</th><th>Prezzo €</th><th>Km</th><th>Luogo</th><th>Link</th></tr></thead>
<tbody>
{listing_rows}</tbody>
</table>
</div>

<footer class="muted">Report generato offline. Se il catalogo cambia markup, aggiorna i selettori del profilo.</footer>

<script>
const data = {charts};
const layout = (x, y, h) => ({{ height: h, margin: {{ l: 50, r: 10, t: 10, b: 40 }}, xaxis: {{ title: x }}, yaxis: {{ title: y }} }});
Plotly.newPlot("scatter", [{{ x: data.scatter_x, y: data.scatter_y, mode: "markers", name: "Annunci",
  hovertemplate: "Anno %{{x}}<br>€%{{y}}<extra></extra>" }}], layout("Anno", "Prezzo (€)", 420));
Plotly.newPlot("mean-line", [{{ x: data.mean_x, y: data.mean_y, mode: "lines+markers", name: "Prezzo medio",
  hovertemplate: "Anno %{{x}}<br>Media €%{{y:.0f}}<extra></extra>" }}], layout("Anno", "Prezzo medio (€)", 320));
</script>
</body>
</html>
"#,
        label = escape_html(&header.search_label),
        plotly = PLOTLY_CDN,
        url = url,
        count = data.dataset.len(),
        generated = header.generated_at.format("%Y-%m-%d %H:%M"),
        extremes = extremes_block(data),
        stats_rows = stats_rows(data),
        listing_rows = listing_rows(data),
        charts = charts,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::{build_dataset, price_extremes, yearly_stats};
    use crate::domain::model::{ListingRecord, YearSource};

    fn report_data(records: Vec<ListingRecord>) -> ReportData {
        let dataset = build_dataset(records);
        let yearly_stats = yearly_stats(&dataset);
        ReportData {
            extremes: price_extremes(&yearly_stats),
            yearly_stats,
            dataset,
        }
    }

    fn listing(year: i32, price: u64, location: Option<&str>) -> ListingRecord {
        ListingRecord {
            brand: "Honda".to_string(),
            model: "CBR 650 R".to_string(),
            year,
            price_eur: price,
            km: Some(1000),
            location: location.map(String::from),
            source_url: format!("https://www.moto.it/annuncio/{}", price),
            year_source: YearSource::Card,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">L'Aquila & co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;L&#39;Aquila &amp; co&lt;/a&gt;"
        );
    }

    #[test]
    fn test_report_contains_tables_and_extremes() {
        let data = report_data(vec![
            listing(2019, 9000, Some("Milano (MI)")),
            listing(2019, 10000, None),
            listing(2021, 12000, Some("L'Aquila (AQ)")),
        ]);
        let header = ReportHeader::new("Honda", "CBR 650 R", "https://www.moto.it/moto-usate/honda/cbr-650-r");

        let html = render_html(&data, &header).unwrap();

        assert!(html.contains("<b>Honda CBR 650 R</b>"));
        assert!(html.contains("Annunci: <b>3</b>"));
        assert!(html.contains(
            "<tr><td>2019</td><td>2</td><td>9500</td><td>9500</td><td>9000</td><td>10000</td></tr>"
        ));
        assert!(html.contains("<td>L&#39;Aquila (AQ)</td>"));
        assert!(html.contains("<b>2019</b><span class=\"muted\">€9500</span>"));
        assert!(html.contains("\"scatter_x\":[2019,2019,2021]"));
        assert!(html.contains(PLOTLY_CDN));
    }

    #[test]
    fn test_report_for_empty_dataset() {
        let data = report_data(Vec::new());
        let header = ReportHeader::new("", "", "https://www.moto.it/moto-usate/x/y");

        let html = render_html(&data, &header).unwrap();

        assert!(html.contains("Annunci: <b>0</b>"));
        assert!(html.contains("Nessun annuncio."));
    }

    #[test]
    fn test_markup_in_search_label_is_escaped() {
        let data = report_data(vec![listing(2020, 5000, None)]);
        let header = ReportHeader::new("</script>", "", "https://example.com");

        let html = render_html(&data, &header).unwrap();

        assert_eq!(html.matches("</script>").count(), 2);
    }
}
