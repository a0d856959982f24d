use anyhow::Result;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Metrics {
    /// Keyed by the full series name, labels included, e.g.
    /// `ocr_errors_total{error_type="ValidationError"}`.
    pub samples: HashMap<String, f64>,
    pub histograms: HashMap<String, HistogramData>,
}

#[derive(Debug, Default)]
pub struct HistogramData {
    pub buckets: HashMap<String, f64>,
    pub sum: f64,
    pub count: f64,
}

impl Metrics {
    pub fn value(&self, series: &str) -> f64 {
        self.samples.get(series).copied().unwrap_or(0.0)
    }
}

/// Parse Prometheus metrics text format
pub fn prom_parse(text: &str) -> Result<Metrics> {
    let mut metrics = Metrics::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((series, value)) = parse_metric_line(line) else {
            continue;
        };
        let (name, labels) = split_series(&series);

        if let Some(base) = name.strip_suffix("_bucket") {
            let le = label_value(labels, "le").unwrap_or("unknown").to_string();
            let histogram = metrics.histograms.entry(base.to_string()).or_default();
            histogram.buckets.insert(le, value);
        } else if let Some(base) = name.strip_suffix("_sum") {
            metrics.histograms.entry(base.to_string()).or_default().sum = value;
        } else if let Some(base) = name.strip_suffix("_count") {
            metrics.histograms.entry(base.to_string()).or_default().count = value;
            metrics.samples.insert(series.clone(), value);
        } else {
            metrics.samples.insert(series.clone(), value);
        }
    }

    Ok(metrics)
}

fn parse_metric_line(line: &str) -> Option<(String, f64)> {
    let space_pos = line.rfind(' ')?;
    let series = line[..space_pos].trim().to_string();
    let value = line[space_pos + 1..].trim().parse::<f64>().ok()?;
    Some((series, value))
}

fn split_series(series: &str) -> (&str, &str) {
    match series.find('{') {
        Some(brace) => (&series[..brace], series[brace..].trim_matches(|c| c == '{' || c == '}')),
        None => (series, ""),
    }
}

fn label_value<'a>(labels: &'a str, key: &str) -> Option<&'a str> {
    labels.split(',').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k.trim() == key).then(|| v.trim().trim_matches('"'))
    })
}
