// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Tabular sample files.
//!
//! One header row, then one row per sample:
//!
//! ```text
//! timestamp,temp_C,moisture_pct,co2_ppm,light_lux,fallback_active
//! 2024-01-01 00:00:00,23.05,60.2,403,0,False
//! ```
//!
//! A missing moisture reading is an empty field. When reading, rows with an
//! unparsable timestamp or numeric field are skipped and reported as
//! [`RowWarning`]s instead of aborting the file.

use crate::classifier::Classification;
use crate::error::DatasetError;
use crate::sample::{format_timestamp, Sample};
use chrono::NaiveDateTime;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Column headers, in file order.
pub const CSV_HEADERS: [&str; 6] = [
    "timestamp",
    "temp_C",
    "moisture_pct",
    "co2_ppm",
    "light_lux",
    "fallback_active",
];

/// Accepted timestamp layouts (fractional seconds optional).
const TIMESTAMP_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A row that was skipped while reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWarning {
    /// 1-based line in the file
    pub line: u64,
    /// What was wrong
    pub message: String,
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Outcome of reading one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Parsed sample
    Sample(Sample),
    /// Row skipped
    Skipped(RowWarning),
}

/// Streaming CSV sample writer.
pub struct SampleWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl SampleWriter<File> {
    /// Create (or overwrite) a file and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let writer = csv::Writer::from_path(path)?;
        Self::with_csv_writer(writer)
    }
}

impl<W: Write> SampleWriter<W> {
    /// Wrap any writer and write the header.
    pub fn from_writer(inner: W) -> Result<Self, DatasetError> {
        Self::with_csv_writer(csv::Writer::from_writer(inner))
    }

    fn with_csv_writer(mut writer: csv::Writer<W>) -> Result<Self, DatasetError> {
        writer.write_record(CSV_HEADERS)?;
        Ok(Self { writer, rows: 0 })
    }

    /// Write one classified sample.
    pub fn write(
        &mut self,
        sample: &Sample,
        classification: &Classification,
    ) -> Result<(), DatasetError> {
        let moisture = sample
            .moisture_pct
            .map(|m| format!("{:.1}", m))
            .unwrap_or_default();
        let flag = if classification.fallback_active() {
            "True"
        } else {
            "False"
        };

        self.writer.write_record([
            format_timestamp(&sample.timestamp),
            format!("{:.2}", sample.temperature_c),
            moisture,
            format!("{:.0}", sample.co2_ppm),
            format!("{:.0}", sample.light_lux),
            flag.to_string(),
        ])?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far (header excluded).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and return the number of rows written.
    pub fn finish(mut self) -> Result<usize, DatasetError> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    temperature: usize,
    moisture: usize,
    co2: usize,
    light: usize,
}

/// Streaming CSV sample reader.
pub struct SampleReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    columns: Columns,
    next_index: usize,
}

impl SampleReader<File> {
    /// Open a file and check its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let reader = csv::Reader::from_path(path)?;
        Self::with_csv_reader(reader)
    }
}

impl<R: Read> SampleReader<R> {
    /// Wrap any reader and check its header.
    pub fn from_reader(inner: R) -> Result<Self, DatasetError> {
        Self::with_csv_reader(csv::Reader::from_reader(inner))
    }

    fn with_csv_reader(mut reader: csv::Reader<R>) -> Result<Self, DatasetError> {
        let headers = reader.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
        };

        let columns = Columns {
            timestamp: find(CSV_HEADERS[0])?,
            temperature: find(CSV_HEADERS[1])?,
            moisture: find(CSV_HEADERS[2])?,
            co2: find(CSV_HEADERS[3])?,
            light: find(CSV_HEADERS[4])?,
        };

        Ok(Self {
            records: reader.into_records(),
            columns,
            next_index: 0,
        })
    }

    /// Read everything, splitting parsed samples from skipped rows.
    pub fn read_all(self) -> Result<(Vec<Sample>, Vec<RowWarning>), DatasetError> {
        let mut samples = Vec::new();
        let mut warnings = Vec::new();
        for outcome in self {
            match outcome? {
                RowOutcome::Sample(sample) => samples.push(sample),
                RowOutcome::Skipped(warning) => warnings.push(warning),
            }
        }
        Ok((samples, warnings))
    }

    fn parse_record(&self, record: &csv::StringRecord, index: usize) -> Result<Sample, String> {
        let field = |column: usize, name: &str| {
            record
                .get(column)
                .map(str::trim)
                .ok_or_else(|| format!("missing {} field", name))
        };

        let timestamp = parse_timestamp(field(self.columns.timestamp, "timestamp")?)?;
        let temperature = parse_number(field(self.columns.temperature, "temp_C")?, "temp_C")?;
        let moisture = parse_optional(field(self.columns.moisture, "moisture_pct")?)?;
        let co2 = parse_number(field(self.columns.co2, "co2_ppm")?, "co2_ppm")?;
        let light = parse_number(field(self.columns.light, "light_lux")?, "light_lux")?;

        Ok(Sample::new(
            index,
            timestamp,
            temperature,
            moisture,
            co2,
            light,
        ))
    }
}

impl<R: Read> Iterator for SampleReader<R> {
    type Item = Result<RowOutcome, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.records.next()?;
        let index = self.next_index;
        self.next_index += 1;

        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Some(Err(e.into())),
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                return Some(Ok(skipped(line, e.to_string())));
            }
        };

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        Some(Ok(match self.parse_record(&record, index) {
            Ok(sample) => RowOutcome::Sample(sample),
            Err(message) => skipped(line, message),
        }))
    }
}

fn skipped(line: u64, message: String) -> RowOutcome {
    let warning = RowWarning { line, message };
    log::warn!("skipping row: {}", warning);
    RowOutcome::Skipped(warning)
}

/// Parse a timestamp in any accepted layout.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    TIMESTAMP_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
        .ok_or_else(|| format!("invalid timestamp '{}'", value))
}

fn parse_number(value: &str, name: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid {} value '{}'", name, value)),
    }
}

fn parse_optional(value: &str) -> Result<Option<f64>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!("invalid moisture_pct value '{}'", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use tempfile::NamedTempFile;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = ts("2024-01-01 21:50:00");
        assert_eq!(ts("2024-01-01T21:50:00"), expected);
        assert_eq!(
            ts("2024-01-01 21:50:00.250000"),
            expected + chrono::Duration::milliseconds(250)
        );
        assert!(parse_timestamp("01/01/2024 21:50").is_err());
    }

    #[test]
    fn test_write_then_read_file() {
        let classifier = Classifier::new();
        let samples = vec![
            Sample::new(0, ts("2024-01-01 00:00:00"), 23.05, Some(60.2), 403.0, 0.0),
            Sample::new(1, ts("2024-01-01 00:05:00"), 46.2, Some(35.0), 410.0, 520.0),
            Sample::new(2, ts("2024-01-01 00:10:00"), 24.0, None, 400.0, 0.0),
        ];

        let file = NamedTempFile::new().unwrap();
        let mut writer = SampleWriter::create(file.path()).unwrap();
        for sample in &samples {
            writer.write(sample, &classifier.classify(sample)).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 3);

        let (loaded, warnings) = SampleReader::open(file.path()).unwrap().read_all().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(loaded, samples);
    }

    #[test]
    fn test_written_layout() {
        let classifier = Classifier::new();
        let sample = Sample::new(0, ts("2024-01-01 00:10:00"), 24.0, None, 400.0, 0.0);

        let mut buffer = Vec::new();
        {
            let mut writer = SampleWriter::from_writer(&mut buffer).unwrap();
            writer.write(&sample, &classifier.classify(&sample)).unwrap();
            writer.finish().unwrap();
        }
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "timestamp,temp_C,moisture_pct,co2_ppm,light_lux,fallback_active\n\
             2024-01-01 00:10:00,24.00,,400,0,True\n"
        );
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let data = "timestamp,temp_C,moisture_pct,co2_ppm,light_lux,fallback_active\n\
                    2024-01-01 00:00:00,23.1,60.0,400,0,False\n\
                    not-a-time,23.1,60.0,400,0,False\n\
                    2024-01-01 00:10:00,hot,60.0,400,0,False\n\
                    2024-01-01 00:15:00,23.3,nan,405,0,False\n";

        let (samples, warnings) = SampleReader::from_reader(data.as_bytes())
            .unwrap()
            .read_all()
            .unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].moisture_pct, None);
        assert_eq!(samples[1].index, 3);

        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].line, 3);
        assert!(warnings[0].message.contains("timestamp"));
        assert_eq!(warnings[1].line, 4);
        assert!(warnings[1].message.contains("temp_C"));
    }

    #[test]
    fn test_short_row_is_skipped() {
        let data = "timestamp,temp_C,moisture_pct,co2_ppm,light_lux,fallback_active\n\
                    2024-01-01 00:00:00,23.1\n\
                    2024-01-01 00:05:00,23.2,60.0,400,0,False\n";

        let (samples, warnings) = SampleReader::from_reader(data.as_bytes())
            .unwrap()
            .read_all()
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_missing_column() {
        let data = "timestamp,temp_C,co2_ppm,light_lux\n";
        let result = SampleReader::from_reader(data.as_bytes());
        assert!(matches!(
            result,
            Err(DatasetError::MissingColumn(ref c)) if c == "moisture_pct"
        ));
    }

    #[test]
    fn test_fallback_column_optional_on_read() {
        let data = "timestamp,temp_C,moisture_pct,co2_ppm,light_lux\n\
                    2024-01-01 00:00:00,23.1,60.0,400,0\n";
        let (samples, _) = SampleReader::from_reader(data.as_bytes())
            .unwrap()
            .read_all()
            .unwrap();
        assert_eq!(samples.len(), 1);
    }
}
