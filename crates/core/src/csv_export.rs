//! CSV export for measurements
//!
//! Flat tabular output for spreadsheets and estimating tools.

use crate::measurement::{Measurement, MeasurementKind};
use std::io::Write;

/// Error types for CSV export
#[derive(Debug, thiserror::Error)]
pub enum CsvExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),
}

pub type CsvExportResult<T> = Result<T, CsvExportError>;

/// Configuration for CSV export
#[derive(Debug, Clone)]
pub struct CsvExportConfig {
    /// Include column headers in the output
    pub include_headers: bool,

    /// CSV delimiter character
    pub delimiter: u8,

    /// Export only one kind (None = all)
    pub kind_filter: Option<MeasurementKind>,
}

impl Default for CsvExportConfig {
    fn default() -> Self {
        Self {
            include_headers: true,
            delimiter: b',',
            kind_filter: None,
        }
    }
}

/// Export measurements to CSV format
///
/// CSV columns:
/// - ID: Unique measurement identifier
/// - Label: User-facing label
/// - Kind: Linear or Area
/// - Points: Vertex count
/// - Pixel Value: Length in px or area in px², full precision
/// - Value: Real-unit value rounded to two decimals
/// - Unit: Display unit (squared for areas)
/// - Calibrated: false when Value is still in pixels
pub fn export_measurements_csv<W: Write>(
    writer: W,
    measurements: &[Measurement],
    config: &CsvExportConfig,
) -> CsvExportResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(config.include_headers)
        .from_writer(writer);

    if config.include_headers {
        csv_writer.write_record([
            "ID",
            "Label",
            "Kind",
            "Points",
            "Pixel Value",
            "Value",
            "Unit",
            "Calibrated",
        ])?;
    }

    let rows = measurements
        .iter()
        .filter(|m| config.kind_filter.map_or(true, |kind| m.kind() == kind));

    for measurement in rows {
        csv_writer.write_record(&[
            measurement.id().to_string(),
            measurement.label().to_string(),
            measurement.kind().name().to_string(),
            measurement.points().len().to_string(),
            measurement.pixel_value().to_string(),
            format!("{:.2}", measurement.value_real_units()),
            measurement.display_unit(),
            measurement.is_calibrated().to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Export measurements to a CSV string
pub fn measurements_to_csv_string(
    measurements: &[Measurement],
    config: &CsvExportConfig,
) -> CsvExportResult<String> {
    let mut buffer = Vec::new();
    export_measurements_csv(&mut buffer, measurements, config)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::scale::Scale;

    fn measurements() -> Vec<Measurement> {
        let scale = Scale::new(10.0, "ft");
        vec![
            Measurement::new(
                "Fence, north",
                vec![Point::new(0.0, 0.0), Point::new(125.0, 0.0)],
                MeasurementKind::Linear,
                &scale,
            )
            .unwrap(),
            Measurement::new(
                "Patio",
                vec![Point::new(0.0, 0.0), Point::new(40.0, 0.0), Point::new(0.0, 30.0)],
                MeasurementKind::Area,
                &scale,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_export_with_headers() {
        let data = measurements();
        let csv = measurements_to_csv_string(&data, &CsvExportConfig::default()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ID,Label,Kind,Points,Pixel Value,Value,Unit,Calibrated");
        assert!(lines[1].ends_with(",\"Fence, north\",Linear,2,125,12.50,ft,true"));
        assert!(lines[2].ends_with(",Patio,Area,3,600,6.00,ft²,true"));
    }

    #[test]
    fn test_export_without_headers() {
        let config = CsvExportConfig { include_headers: false, ..Default::default() };
        let csv = measurements_to_csv_string(&measurements(), &config).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn test_kind_filter_and_delimiter() {
        let config = CsvExportConfig {
            delimiter: b';',
            kind_filter: Some(MeasurementKind::Area),
            ..Default::default()
        };
        let csv = measurements_to_csv_string(&measurements(), &config).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(";Patio;Area;"));
    }
}
