// Fallback Sim - Integration Tests
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! End-to-end tests: generate → classify → SQLite event log.

use chrono::{NaiveDate, NaiveDateTime};
use fallback_sim::*;
use tempfile::TempDir;

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn sqlite_logger(dir: &TempDir) -> EventLogger<SqliteStore> {
    EventLogger::new(SqliteStore::open(dir.path().join("events.db")).unwrap()).unwrap()
}

#[test]
fn hot_dry_sample_is_logged_with_known_checksum() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(Classifier::new(), sqlite_logger(&dir));

    let sample = Sample::new(550, at(21, 50), 46.2, Some(35.0), 410.0, 520.0);
    let classification = pipeline.process(&sample).unwrap();
    assert_eq!(
        classification.reasons,
        vec![ReasonCode::HighTemp, ReasonCode::LowMoisture]
    );

    let events = pipeline.logger().store().events().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].timestamp, "2024-01-01 21:50:00");
    assert_eq!(events[0].reasons, "high_temp, low_moisture");
    assert_eq!(events[0].fallback_active, 1);
    assert_eq!(events[0].crc, "c3670546");
}

#[test]
fn dropout_only_sample() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(Classifier::new(), sqlite_logger(&dir));

    pipeline
        .process(&Sample::new(2, at(0, 10), 22.0, None, 400.0, 300.0))
        .unwrap();

    let events = pipeline.logger().store().events().unwrap();
    assert_eq!(events[0].reasons, "moisture_dropout");
    assert_eq!(events[0].crc, "08072875");
}

#[test]
fn nominal_sample_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(Classifier::new(), sqlite_logger(&dir));

    let classification = pipeline
        .process(&Sample::new(0, at(0, 0), 24.0, Some(60.0), 400.0, 520.0))
        .unwrap();

    assert!(!classification.fallback_active());
    assert_eq!(pipeline.logger().store().count().unwrap(), 0);
}

#[test]
fn dry_out_flags_only_its_window() {
    let dir = TempDir::new().unwrap();
    let generator = SignalGenerator::new(
        GeneratorConfig::new()
            .with_duration_hours(96.0)
            .with_seed(42),
    )
    .unwrap();
    let window = AnomalyWindow::dry_out().index_range(5, generator.sample_count());
    assert_eq!(window, 1001..1100);

    let mut flagged = Vec::new();
    let mut pipeline = Pipeline::new(Classifier::new(), sqlite_logger(&dir));
    let summary = pipeline
        .run_samples(generator.samples(), |sample, classification| {
            if classification.fallback_active() {
                flagged.push((sample.index, classification.reasons.clone()));
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(summary.samples, 1152);
    assert!(flagged.len() >= 15, "only {} samples flagged", flagged.len());
    for (index, reasons) in &flagged {
        assert!(window.contains(index), "sample {} flagged", index);
        assert_eq!(reasons, &vec![ReasonCode::LowMoisture]);
    }
    assert_eq!(summary.inserted, flagged.len());
    assert_eq!(
        pipeline.logger().store().count().unwrap(),
        flagged.len()
    );
}

#[test]
fn rerun_appends_duplicates_and_fresh_resets() {
    let dir = TempDir::new().unwrap();
    let config = GeneratorConfig::new()
        .with_duration_hours(6.0)
        .with_seed(3)
        .with_moisture_dropout(0.2);
    let generator = SignalGenerator::new(config).unwrap();

    let first = {
        let mut pipeline = Pipeline::new(Classifier::new(), sqlite_logger(&dir));
        let summary = pipeline.run(&generator).unwrap();
        pipeline.into_logger().close().unwrap();
        summary
    };
    assert!(first.inserted > 0);

    let mut pipeline = Pipeline::new(Classifier::new(), sqlite_logger(&dir));
    pipeline.run(&generator).unwrap();
    let events = pipeline.logger().store().events().unwrap();
    assert_eq!(events.len(), 2 * first.inserted);
    assert_eq!(
        events[0].timestamp,
        events[first.inserted].timestamp
    );
    assert!(events.windows(2).all(|w| w[0].id < w[1].id));

    let removed = pipeline.logger_mut().truncate().unwrap();
    assert_eq!(removed, 2 * first.inserted);
    assert_eq!(pipeline.logger().store().count().unwrap(), 0);
}

#[test]
fn stored_rows_verify_and_tampering_is_detected() {
    let dir = TempDir::new().unwrap();
    let hot = ChannelModel::new(Sinusoid::new(36.0, 0.0, 1.0), 0.0);
    let generator = SignalGenerator::new(
        GeneratorConfig::new()
            .with_duration_hours(1.0)
            .with_seed(8)
            .with_temperature(hot),
    )
    .unwrap();

    let mut pipeline = Pipeline::new(Classifier::new(), sqlite_logger(&dir));
    pipeline.run(&generator).unwrap();

    for event in pipeline.logger().store().events().unwrap() {
        let expected = row_crc(&event.timestamp, &event.reasons, event.fallback_active);
        assert_eq!(event.crc, expected);
        assert_eq!(event.reason_codes().unwrap(), vec![ReasonCode::HighTemp]);
    }
    assert!(pipeline.logger().audit().unwrap().is_intact());

    pipeline
        .logger()
        .store()
        .connection()
        .execute(
            "UPDATE fallback_events SET reasons = 'low_moisture' WHERE id = 3",
            [],
        )
        .unwrap();

    let report = pipeline.logger().audit().unwrap();
    assert_eq!(report.checked, 12);
    assert_eq!(report.corrupted, vec![3]);
}

#[test]
fn csv_written_then_replayed_logs_the_same_events() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("samples.csv");
    let generator = SignalGenerator::new(
        GeneratorConfig::new()
            .with_duration_hours(24.0)
            .with_seed(11)
            .with_moisture_dropout(0.05),
    )
    .unwrap();

    let mut live = Pipeline::new(
        Classifier::new(),
        EventLogger::new(MemoryStore::new()).unwrap(),
    );
    let mut writer = SampleWriter::create(&csv_path).unwrap();
    let written = live.run_with_csv(&generator, &mut writer).unwrap();
    assert_eq!(writer.finish().unwrap(), 288);

    let mut replayed = Pipeline::new(Classifier::new(), sqlite_logger(&dir));
    let summary = replayed
        .replay(SampleReader::open(&csv_path).unwrap())
        .unwrap();

    assert!(summary.skipped.is_empty());
    assert_eq!(summary.samples, written.samples);
    assert_eq!(summary.inserted, written.inserted);
    assert_eq!(summary.reasons, written.reasons);

    let live_events = live.logger().store().events().unwrap();
    let replay_events = replayed.logger().store().events().unwrap();
    assert_eq!(live_events, replay_events);
}

#[test]
fn simulation_config_drives_a_run() {
    let dir = TempDir::new().unwrap();
    let config = SimulationConfig::from_json_str(
        r#"{ "generator": { "duration_hours": 2, "interval_minutes": 10, "seed": 1,
                            "moisture_dropout_probability": 1.0 },
             "classifier": { "co2_noise_ppm": 100 } }"#,
    )
    .unwrap();
    assert_eq!(config.validate(), Ok(12));

    let generator = SignalGenerator::new(config.generator.clone()).unwrap();
    let mut pipeline = Pipeline::new(
        Classifier::with_config(config.classifier.clone()),
        sqlite_logger(&dir),
    );
    let summary = pipeline.run(&generator).unwrap();

    assert_eq!(summary.inserted, 12);
    assert_eq!(summary.reasons.get(ReasonCode::MoistureDropout), 12);
    assert_eq!(summary.reasons.get(ReasonCode::Co2Noise), 12);
    let events = pipeline.logger().store().events().unwrap();
    assert_eq!(events[1].timestamp, "2024-01-01 00:10:00");
    assert_eq!(events[1].reasons, "moisture_dropout, co2_noise");
}

#[test]
fn invalid_configuration_is_rejected() {
    assert!(matches!(
        SignalGenerator::new(GeneratorConfig::new().with_interval_minutes(0)),
        Err(ConfigError::InvalidInterval { .. })
    ));
    assert!(matches!(
        SignalGenerator::new(GeneratorConfig::new().with_duration_hours(0.0)),
        Err(ConfigError::InvalidDuration { .. })
    ));
    assert!(matches!(
        SignalGenerator::new(GeneratorConfig::new().with_moisture_dropout(1.5)),
        Err(ConfigError::InvalidProbability(_))
    ));
}
