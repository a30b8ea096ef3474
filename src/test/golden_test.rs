use super::test_out_dir;
use crate::golden::{GoldenFile, GoldenWriter, SectionKind};
use approx::assert_abs_diff_eq;
use ndarray::array;

#[test]
fn test_golden_pair_round_trip() {
    let dir = test_out_dir("golden_round_trip");
    let mut writer = GoldenWriter::create(&dir, "round_trip").unwrap();

    let input = array![[1.0f32, -2.5], [0.25, 4.0]].into_dyn();
    writer
        .push_tensor(0, SectionKind::Input, "input0", &input)
        .unwrap();
    writer.push_scalar(0, SectionKind::Loss, "loss", 0.75).unwrap();
    writer
        .push_scalar(1, SectionKind::Loss, "loss", 0.5)
        .unwrap();
    let manifest = writer.finish().unwrap();

    assert_eq!(manifest.iterations, 2);
    assert_eq!(manifest.sections.len(), 3);

    let golden = GoldenFile::open(&dir, "round_trip").unwrap();
    assert_eq!(golden.manifest.name, "round_trip");
    assert_eq!(golden.manifest.sections[0].kind, SectionKind::Input);
    assert_eq!(golden.manifest.sections[0].label, "input0");
    assert_eq!(golden.manifest.sections[0].len, 4);

    let expected: Vec<f32> = input.iter().copied().collect();
    assert_eq!(golden.values[0].len(), 4);
    for (a, b) in golden.values[0].iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }
    assert_abs_diff_eq!(golden.values[1][0], 0.75, epsilon = 1e-12);
    assert_abs_diff_eq!(golden.values[2][0], 0.5, epsilon = 1e-12);
}

#[test]
fn test_golden_open_missing_pair_fails() {
    let dir = test_out_dir("golden_missing");
    assert!(GoldenFile::open(&dir, "does_not_exist").is_err());
}

#[test]
fn test_golden_truncated_stream_fails() {
    let dir = test_out_dir("golden_truncated");
    let mut writer = GoldenWriter::create(&dir, "truncated").unwrap();
    writer
        .push_scalar(0, SectionKind::Loss, "loss", 1.0)
        .unwrap();
    writer.finish().unwrap();

    // Chop the value stream behind the manifest's back.
    let data = dir.join("truncated.nnmodelgolden");
    std::fs::write(&data, [0u8, 1]).unwrap();
    assert!(GoldenFile::open(&dir, "truncated").is_err());
}
