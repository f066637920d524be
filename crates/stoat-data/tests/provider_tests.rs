// End-to-end provider tests against real directory trees of tiny PNGs.

use std::path::Path;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use stoat_data::{OutputMode, ProviderConfig, ProviderError};

/// Write a 1x1 RGB frame whose every channel holds `value`.
fn write_frame(path: &Path, value: u8) {
    RgbImage::from_pixel(1, 1, Rgb([value, value, value]))
        .save(path)
        .unwrap();
}

/// Build `root/<class>/ex_NNN.png` single-frame sources; frame `i` of each
/// class holds pixel value `i`.
fn flat_tree(classes: &[(&str, usize)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (class, count) in classes {
        let class_dir = dir.path().join(class);
        std::fs::create_dir(&class_dir).unwrap();
        for i in 0..*count {
            write_frame(&class_dir.join(format!("ex_{i:03}.png")), i as u8);
        }
    }
    dir
}

/// Build one class with a single clip directory of `n` frames; frame `f`
/// holds pixel value `f + 1` (so zero padding is distinguishable).
fn clip_tree(n_frames: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    let clip = dir.path().join("walking").join("clip_000");
    std::fs::create_dir_all(&clip).unwrap();
    for f in 0..n_frames {
        write_frame(&clip.join(format!("frame_{f:03}.png")), (f + 1) as u8);
    }
    dir
}

#[test]
fn num_batches_rounds_up_and_last_batch_is_short() {
    let tree = flat_tree(&[("a", 10), ("b", 3)]);
    let provider = ProviderConfig::default()
        .batch_size(4)
        .bind_to_directory(tree.path())
        .unwrap();

    assert_eq!(provider.len(), 13);
    assert_eq!(provider.num_batches(), 4);
    let lens: Vec<usize> = (0..4).map(|i| provider.get_batch(i).unwrap().len).collect();
    assert_eq!(lens, vec![4, 4, 4, 1]);
}

#[test]
fn fractional_slicing_selects_the_middle_of_each_class() {
    let tree = flat_tree(&[("a", 10)]);
    let provider = ProviderConfig::default()
        .index_start(Some(0.5))
        .max_per_class(Some(0.2))
        .bind_to_directory(tree.path())
        .unwrap();

    // round(0.5 * 10) = 5, round(0.2 * 10) = 2 → sources 5 and 6
    assert_eq!(provider.len(), 2);
    let batch = provider.get_batch(0).unwrap();
    assert_eq!(batch.inputs, vec![5.0, 5.0, 5.0, 6.0, 6.0, 6.0]);
}

#[test]
fn explicit_class_without_directory_fails_at_bind() {
    let tree = flat_tree(&[("a", 2)]);
    let err = ProviderConfig::default()
        .classes(Some(vec!["a".into(), "ghost".into()]))
        .bind_to_directory(tree.path())
        .unwrap_err();
    assert!(matches!(err, ProviderError::MissingClass { class, .. } if class == "ghost"));
}

#[test]
fn explicit_classes_control_label_order() {
    let tree = flat_tree(&[("a", 1), ("b", 1)]);
    let provider = ProviderConfig::default()
        .classes(Some(vec!["b".into(), "a".into()]))
        .bind_to_directory(tree.path())
        .unwrap();
    assert_eq!(provider.class_names(), ["b".to_string(), "a".to_string()]);
    // first example comes from class "b" and gets label index 0
    let batch = provider.get_batch(0).unwrap();
    assert_eq!(&batch.targets[0..2], &[1.0, 0.0]);
}

#[test]
fn binding_twice_yields_identical_batches() {
    let tree = flat_tree(&[("a", 5), ("b", 4)]);
    let config = ProviderConfig::default().batch_size(3);
    let p1 = config.bind_to_directory(tree.path()).unwrap();
    let p2 = config.bind_to_directory(tree.path()).unwrap();
    for i in 0..p1.num_batches() {
        assert_eq!(p1.get_batch(i).unwrap().inputs, p2.get_batch(i).unwrap().inputs);
        assert_eq!(p1.get_batch(i).unwrap().targets, p2.get_batch(i).unwrap().targets);
    }
}

#[test]
fn short_source_is_padded_to_full_window() {
    // 6 frames, window of 5 at stride 2: offsets 0, 2, 4 real, 2 padded
    let tree = clip_tree(6);
    let provider = ProviderConfig::default()
        .seq_length(Some(5))
        .sample_step(2)
        .pad_sequences(true)
        .bind_to_directory(tree.path())
        .unwrap();

    assert_eq!(provider.len(), 1);
    assert_eq!(provider.data_shape(), Some(&[5usize, 3, 1, 1][..]));
    let batch = provider.get_batch(0).unwrap();
    assert_eq!(batch.input_shape, vec![1, 5, 3, 1, 1]);
    assert_eq!(
        batch.inputs,
        vec![1.0, 1.0, 1.0, 3.0, 3.0, 3.0, 5.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn short_source_is_dropped_without_padding() {
    let tree = clip_tree(6);
    let provider = ProviderConfig::default()
        .seq_length(Some(5))
        .sample_step(2)
        .bind_to_directory(tree.path())
        .unwrap();
    assert_eq!(provider.len(), 0);
    assert_eq!(provider.num_batches(), 0);
    assert!(matches!(
        provider.ensure_non_empty().unwrap_err(),
        ProviderError::EmptyDataset(_)
    ));
}

#[test]
fn overlapping_windows_share_frames() {
    // 12 frames, window 3, overlap 1 → starts 0, 2, 4, 6, 8
    let tree = clip_tree(12);
    let provider = ProviderConfig::default()
        .seq_length(Some(3))
        .seq_overlap(1)
        .bind_to_directory(tree.path())
        .unwrap();
    assert_eq!(provider.len(), 5);
    let first = provider.get_batch(0).unwrap();
    // windows are consecutive in the unshuffled order; window 1 starts at
    // frame 2 (value 3)
    assert_eq!(first.inputs[0], 1.0);
    assert_eq!(first.inputs[9], 3.0);
}

#[test]
fn reconstruction_targets_mirror_inputs() {
    let tree = clip_tree(4);
    let provider = ProviderConfig::default()
        .seq_length(Some(4))
        .output_mode(OutputMode::Reconstruct)
        .bind_to_directory(tree.path())
        .unwrap();
    let batch = provider.get_batch(0).unwrap();
    assert_eq!(batch.targets, batch.inputs);
    assert_eq!(batch.target_shape, batch.input_shape);
}

#[test]
fn corrupt_frame_propagates_decode_error() {
    let tree = flat_tree(&[("a", 2)]);
    // sorts after the valid frames, so binding still succeeds
    std::fs::write(tree.path().join("a").join("zz_bad.png"), b"not a png").unwrap();

    let provider = ProviderConfig::default().bind_to_directory(tree.path()).unwrap();
    assert_eq!(provider.len(), 3);
    let err = provider.get_batch(0).unwrap_err();
    assert!(matches!(err, ProviderError::Decode { .. }));
}

#[test]
fn zero_batch_size_is_treated_as_one() {
    let tree = flat_tree(&[("a", 3)]);
    let provider = ProviderConfig::default()
        .batch_size(0)
        .bind_to_directory(tree.path())
        .unwrap();
    assert_eq!(provider.num_batches(), 3);
    assert_eq!(provider.get_batch(0).unwrap().len, 1);
}

#[test]
fn rescale_maps_pixels_to_unit_range() {
    let dir = TempDir::new().unwrap();
    let class_dir = dir.path().join("a");
    std::fs::create_dir(&class_dir).unwrap();
    write_frame(&class_dir.join("x.png"), 255);

    let provider = ProviderConfig::default()
        .rescale(Some(1.0 / 255.0))
        .bind_to_directory(dir.path())
        .unwrap();
    let batch = provider.get_batch(0).unwrap();
    assert_eq!(batch.inputs, vec![1.0, 1.0, 1.0]);
}

#[test]
fn grayscale_and_resize_shape() {
    let tree = flat_tree(&[("a", 1)]);
    let provider = ProviderConfig::default()
        .grayscale(true)
        .target_size(Some((4, 6)))
        .bind_to_directory(tree.path())
        .unwrap();
    // (height, width) = (4, 6) → [C, H, W] = [1, 4, 6]
    assert_eq!(provider.data_shape(), Some(&[1usize, 4, 6][..]));
    let batch = provider.get_batch(0).unwrap();
    assert_eq!(batch.input_shape, vec![1, 1, 4, 6]);
}

#[test]
fn seeded_shuffle_is_reproducible() {
    let tree = flat_tree(&[("a", 8), ("b", 8)]);
    let config = ProviderConfig::default().shuffle(true).seed(Some(7)).batch_size(4);

    let mut p1 = config.bind_to_directory(tree.path()).unwrap();
    let mut p2 = config.bind_to_directory(tree.path()).unwrap();
    p1.reshuffle();
    p2.reshuffle();
    for i in 0..p1.num_batches() {
        assert_eq!(p1.get_batch(i).unwrap().inputs, p2.get_batch(i).unwrap().inputs);
    }
    // order is stable within an epoch
    assert_eq!(p1.get_batch(0).unwrap().inputs, p1.get_batch(0).unwrap().inputs);
}

#[test]
fn prefetch_matches_direct_batches() {
    let tree = flat_tree(&[("a", 7), ("b", 5)]);
    let mut provider = ProviderConfig::default()
        .batch_size(3)
        .workers(3)
        .queue_size(2)
        .bind_to_directory(tree.path())
        .unwrap();

    let direct: Vec<_> = (0..provider.num_batches())
        .map(|i| provider.get_batch(i).unwrap())
        .collect();

    let iter = provider.iter_epoch();
    assert_eq!(iter.len(), direct.len());
    let prefetched: Vec<_> = iter.map(|b| b.unwrap()).collect();

    assert_eq!(prefetched.len(), direct.len());
    for (got, want) in prefetched.iter().zip(&direct) {
        assert_eq!(got.inputs, want.inputs);
        assert_eq!(got.targets, want.targets);
    }
}

#[test]
fn single_frame_stride_subsamples_sources() {
    // in single-frame mode sample_step strides frames within a source, so
    // a 7-frame clip at step 3 keeps frames 0, 3, 6 as separate examples
    let tree = clip_tree(7);
    let provider = ProviderConfig::default()
        .sample_step(3)
        .bind_to_directory(tree.path())
        .unwrap();
    assert_eq!(provider.len(), 3);
    let batch = provider.get_batch(0).unwrap();
    assert_eq!(batch.inputs[0], 1.0);
    assert_eq!(batch.inputs[3], 4.0);
    assert_eq!(batch.inputs[6], 7.0);
}
