use tankflux_core::alignment::{align_channels, is_strictly_increasing, normalize_timestamps};
use tankflux_core::{ChannelKind, PipelineError, RawChannels};

#[test]
fn align_truncates_every_channel_to_the_shortest() {
    let raw = RawChannels::new(
        (0..10).map(f64::from).collect(),
        (0..7).map(|v| 20.0 + f64::from(v)).collect(),
        (0..12).map(|v| f64::from(v) * 1000.0).collect(),
    );

    let series = align_channels(&raw).expect("align failed");

    assert_eq!(series.len(), 7);
    assert_eq!(series.channel(ChannelKind::Level).expect("level").len(), 7);
    assert_eq!(
        series.channel(ChannelKind::Temperature).expect("temperature").len(),
        7
    );
    assert_eq!(series.time(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn align_converts_milliseconds_relative_to_first_sample() {
    let raw = RawChannels::new(
        vec![1.0, 1.0, 1.0],
        vec![20.0, 20.0, 20.0],
        vec![1_700_000_000_000.0, 1_700_000_000_500.0, 1_700_000_002_000.0],
    );

    let series = align_channels(&raw).expect("align failed");

    assert_eq!(series.time(), &[0.0, 0.5, 2.0]);
}

#[test]
fn normalize_timestamps_handles_empty_input() {
    assert!(normalize_timestamps(&[]).is_empty());
    assert_eq!(normalize_timestamps(&[5000.0, 6000.0]), vec![0.0, 1.0]);
}

#[test]
fn align_sorts_out_of_order_samples_and_keeps_rows_together() {
    let raw = RawChannels::new(
        vec![1.0, 3.0, 2.0],
        vec![10.0, 30.0, 20.0],
        vec![1000.0, 3000.0, 2000.0],
    );

    let series = align_channels(&raw).expect("align failed");

    assert_eq!(series.time(), &[0.0, 1.0, 2.0]);
    assert_eq!(series.channel(ChannelKind::Level).expect("level"), &[1.0, 2.0, 3.0]);
    assert_eq!(
        series.channel(ChannelKind::Temperature).expect("temperature"),
        &[10.0, 20.0, 30.0]
    );
}

#[test]
fn align_rebases_when_the_earliest_sample_is_not_first() {
    let raw = RawChannels::new(
        vec![2.0, 1.0],
        vec![21.0, 20.0],
        vec![2000.0, 1000.0],
    );

    let series = align_channels(&raw).expect("align failed");

    assert_eq!(series.time(), &[0.0, 1.0]);
    assert_eq!(series.channel(ChannelKind::Level).expect("level"), &[1.0, 2.0]);
}

#[test]
fn align_accepts_duplicate_timestamps() {
    let raw = RawChannels::new(
        vec![1.0, 2.0, 3.0],
        vec![20.0, 21.0, 22.0],
        vec![0.0, 1000.0, 1000.0],
    );

    let series = align_channels(&raw).expect("duplicates should be accepted");

    assert_eq!(series.time(), &[0.0, 1.0, 1.0]);
    assert!(!is_strictly_increasing(series.time()));
}

#[test]
fn align_rejects_nan_timestamps() {
    let raw = RawChannels::new(
        vec![1.0, 2.0, 3.0],
        vec![20.0, 21.0, 22.0],
        vec![0.0, f64::NAN, 2000.0],
    );

    let err = align_channels(&raw).expect_err("NaN time must fail");
    assert!(matches!(err, PipelineError::NonMonotonicTime { .. }));
}

#[test]
fn align_requires_all_three_channels() {
    let mut raw = RawChannels::default();
    raw.insert(ChannelKind::Level, vec![1.0]);
    raw.insert(ChannelKind::Timestamp, vec![0.0]);

    let err = align_channels(&raw).expect_err("missing temperature must fail");
    assert!(matches!(
        err,
        PipelineError::RequiredChannelMissing {
            channel: ChannelKind::Temperature
        }
    ));
}

#[test]
fn align_rejects_empty_channels() {
    let raw = RawChannels::new(vec![], vec![20.0], vec![0.0]);

    let err = align_channels(&raw).expect_err("empty channel must fail");
    assert!(matches!(err, PipelineError::EmptyInput));
}
