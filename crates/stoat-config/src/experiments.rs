// Built-in experiment table
//
// The static registration list: feature-extraction runs, the VGG-feature
// classifier family, and the PredNet-representation classifier family,
// over Moments-in-Time and UCF-101 frame trees.

use crate::error::Result;
use crate::experiment::RawConfig;
use crate::registry::Registry;
use crate::value::ConfigValue;

/// Frames extracted per video clip.
const FRAMES_PER_VIDEO: i64 = 90;
/// VGG feature vectors extracted per video clip.
const VGG_FEATURES_PER_VIDEO: i64 = 30;
/// PredNet representation frames extracted per video clip.
const PREDNET_FEATURES_PER_VIDEO: i64 = 5;

const VGG_SAMPLE_STEP: i64 = 2;
const FRAME_SAMPLE_STEP: i64 = 6;

const UCF_DATA_DIR: &str = "../../datasets/ucf_data";

fn raw(pairs: &[(&str, ConfigValue)]) -> RawConfig {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Build the registry holding every built-in experiment.
///
/// Fails only if a registration references a task missing from the
/// built-in task table, which would be a programming error caught by the
/// first `Registry::builtin()` call in any test run.
pub fn builtin() -> Result<Registry> {
    let mut reg = Registry::new();

    // Feature extraction passes: no training, one forward pass per frame.
    reg.register(
        "moments__features",
        raw(&[
            (
                "description",
                "Extract VGG features from Moments-in-Time frames".into(),
            ),
            ("input_shape", ConfigValue::IntList(vec![160, 160, 3])),
            ("batch_size", 10usize.into()),
            ("sample_step", 3usize.into()),
            ("task", "10c".into()),
            ("model_type", "vgg_imagenet".into()),
            ("base_results_dir", "./results".into()),
            (
                "training_data_dir",
                "../../datasets/moments_video_frames/training".into(),
            ),
            (
                "validation_data_dir",
                "../../datasets/moments_video_frames/validation".into(),
            ),
        ]),
        None,
    )?;

    reg.register(
        "ucf__features",
        raw(&[
            (
                "description",
                "Extract VGG features from UCF-101 frames".into(),
            ),
            ("input_shape", ConfigValue::IntList(vec![160, 160, 3])),
            ("batch_size", 10usize.into()),
            ("sample_step", 3usize.into()),
            ("task", "full".into()),
            ("model_type", "vgg_imagenet".into()),
            ("base_results_dir", "./results".into()),
            (
                "training_data_dir",
                format!("{UCF_DATA_DIR}/train_01").into(),
            ),
            (
                "validation_data_dir",
                format!("{UCF_DATA_DIR}/test_01").into(),
            ),
        ]),
        None,
    )?;

    // Shared defaults for classifiers over pre-extracted VGG features.
    let vgg_base = raw(&[
        ("epochs", 100usize.into()),
        ("stopping_patience", 50usize.into()),
        ("batch_size", 10usize.into()),
        ("shuffle", true.into()),
        ("dropout", 0.9.into()),
        ("task", "2c_easy".into()),
        ("model_type", "lstm".into()),
        ("hidden_dims", ConfigValue::IntList(vec![64])),
        ("training_index_start", 0.6.into()),
        ("training_max_per_class", 0.2.into()),
        ("test_index_start", 0.8.into()),
        ("test_max_per_class", 0.2.into()),
        ("base_results_dir", "./results".into()),
        (
            "training_data_dir",
            "./results/vgg_imagenet__moments__features__10c/training".into(),
        ),
        (
            "validation_data_dir",
            "./results/vgg_imagenet__moments__features__10c/validation".into(),
        ),
        (
            "test_data_dir",
            "./results/vgg_imagenet__moments__features__10c/training".into(),
        ),
    ]);

    reg.register(
        "moments__vgg_imagenet",
        raw(&[
            ("description", "LSTM classifier over VGG features".into()),
            (
                "seq_length",
                (VGG_FEATURES_PER_VIDEO / VGG_SAMPLE_STEP).into(),
            ),
            (
                "min_seq_length",
                (VGG_FEATURES_PER_VIDEO / VGG_SAMPLE_STEP).into(),
            ),
            ("sample_step", VGG_SAMPLE_STEP.into()),
        ]),
        Some(&vgg_base),
    )?;

    reg.register(
        "moments__vgg_random",
        raw(&[
            (
                "description",
                "LSTM classifier over untrained-VGG features".into(),
            ),
            (
                "seq_length",
                (VGG_FEATURES_PER_VIDEO / VGG_SAMPLE_STEP).into(),
            ),
            (
                "min_seq_length",
                (VGG_FEATURES_PER_VIDEO / VGG_SAMPLE_STEP).into(),
            ),
            ("sample_step", VGG_SAMPLE_STEP.into()),
            (
                "training_data_dir",
                "./results/vgg_random__moments__features__10c/training".into(),
            ),
            (
                "validation_data_dir",
                "./results/vgg_random__moments__features__10c/validation".into(),
            ),
            (
                "test_data_dir",
                "./results/vgg_random__moments__features__10c/training".into(),
            ),
        ]),
        Some(&vgg_base),
    )?;

    reg.register(
        "moments__images",
        raw(&[
            ("description", "ConvLSTM classifier over raw frames".into()),
            ("model_type", "convlstm".into()),
            ("seq_length", (FRAMES_PER_VIDEO / FRAME_SAMPLE_STEP).into()),
            ("sample_step", FRAME_SAMPLE_STEP.into()),
            ("input_channels", 3usize.into()),
            ("input_height", 128usize.into()),
            ("input_width", 160usize.into()),
            ("rescale", (1.0 / 255.0).into()),
            ("pad_sequences", true.into()),
            ("average_predictions", true.into()),
            (
                "training_data_dir",
                "../../datasets/moments_video_frames/training".into(),
            ),
            (
                "validation_data_dir",
                "../../datasets/moments_video_frames/validation".into(),
            ),
            (
                "test_data_dir",
                "../../datasets/moments_video_frames/training".into(),
            ),
        ]),
        Some(&vgg_base),
    )?;

    reg.register(
        "ucf__images",
        raw(&[
            ("description", "ConvLSTM classifier over raw frames".into()),
            ("model_type", "convlstm".into()),
            ("task", "full".into()),
            ("seq_length", (FRAMES_PER_VIDEO / FRAME_SAMPLE_STEP).into()),
            ("sample_step", FRAME_SAMPLE_STEP.into()),
            ("input_channels", 3usize.into()),
            ("input_height", 128usize.into()),
            ("input_width", 160usize.into()),
            ("rescale", (1.0 / 255.0).into()),
            ("pad_sequences", true.into()),
            ("average_predictions", true.into()),
            ("training_max_per_class", 0.9.into()),
            ("training_index_start", 0usize.into()),
            ("validation_index_start", 0.9.into()),
            ("test_max_per_class", ConfigValue::None),
            ("test_index_start", 0usize.into()),
            (
                "training_data_dir",
                format!("{UCF_DATA_DIR}/train_01").into(),
            ),
            (
                "validation_data_dir",
                format!("{UCF_DATA_DIR}/train_01").into(),
            ),
            ("test_data_dir", format!("{UCF_DATA_DIR}/test_01").into()),
        ]),
        Some(&vgg_base),
    )?;

    // PredNet-representation classifiers: shorter sequences, a 50/50
    // train/test split of the feature trees.
    let mut prednet_base = vgg_base.clone();
    prednet_base.extend(raw(&[
        ("seq_length", PREDNET_FEATURES_PER_VIDEO.into()),
        ("min_seq_length", PREDNET_FEATURES_PER_VIDEO.into()),
        ("training_index_start", 0usize.into()),
        ("training_max_per_class", 0.5.into()),
        ("test_index_start", 0.5.into()),
        ("test_max_per_class", ConfigValue::None),
        ("hidden_dims", ConfigValue::IntList(vec![64])),
        ("model_type", "lstm".into()),
        ("max_seq_per_source", 1usize.into()),
    ]));

    for (name, desc, stem) in [
        (
            "prednet_kitti_moments",
            "LSTM over PredNet (KITTI-pretrained) representations of Moments-in-Time",
            "prednet_kitti__moments__representation__10c",
        ),
        (
            "prednet_random_moments",
            "LSTM over PredNet (random weights) representations of Moments-in-Time",
            "prednet_random__moments__representation__10c",
        ),
        (
            "prednet_kitti_finetuned_moments_10c",
            "LSTM over PredNet (finetuned on Moments-in-Time) representations",
            "prednet_kitti_finetuned_moments__representation__10c",
        ),
    ] {
        reg.register(
            name,
            raw(&[
                ("description", desc.into()),
                (
                    "training_data_dir",
                    format!("../prednet/results/{stem}/training").into(),
                ),
                (
                    "validation_data_dir",
                    format!("../prednet/results/{stem}/validation").into(),
                ),
                (
                    "test_data_dir",
                    format!("../prednet/results/{stem}/training").into(),
                ),
            ]),
            Some(&prednet_base),
        )?;
    }

    reg.register(
        "prednet_random__ucf_01",
        raw(&[
            (
                "description",
                "LSTM over PredNet representations of UCF-101".into(),
            ),
            ("task", "full".into()),
            ("seq_length", PREDNET_FEATURES_PER_VIDEO.into()),
            ("batch_size", 20usize.into()),
            ("min_seq_length", 1usize.into()),
            ("pad_sequences", true.into()),
            ("average_predictions", true.into()),
            ("training_max_per_class", 0.9.into()),
            ("training_index_start", 0usize.into()),
            ("validation_index_start", 0.9.into()),
            ("test_max_per_class", ConfigValue::None),
            ("test_index_start", 0usize.into()),
            (
                "training_data_dir",
                "../prednet/results/prednet_random__ucf_01__representation__full/training".into(),
            ),
            (
                "validation_data_dir",
                "../prednet/results/prednet_random__ucf_01__representation__full/training".into(),
            ),
            (
                "test_data_dir",
                "../prednet/results/prednet_random__ucf_01__representation__full/validation".into(),
            ),
        ]),
        Some(&prednet_base),
    )?;

    reg.register(
        "vgg_imagenet__ucf_01",
        raw(&[
            (
                "description",
                "LSTM over VGG Imagenet features of UCF-101".into(),
            ),
            ("task", "full".into()),
            ("seq_length", VGG_FEATURES_PER_VIDEO.into()),
            ("batch_size", 20usize.into()),
            ("min_seq_length", 4usize.into()),
            ("pad_sequences", true.into()),
            ("average_predictions", true.into()),
            ("training_max_per_class", 0.9.into()),
            ("training_index_start", 0usize.into()),
            ("validation_index_start", 0.9.into()),
            ("test_max_per_class", ConfigValue::None),
            ("test_index_start", 0usize.into()),
            (
                "training_data_dir",
                "./results/vgg_imagenet__ucf__features__full/train_01".into(),
            ),
            (
                "validation_data_dir",
                "./results/vgg_imagenet__ucf__features__full/train_01".into(),
            ),
            (
                "test_data_dir",
                "./results/vgg_imagenet__ucf__features__full/test_01".into(),
            ),
        ]),
        Some(&prednet_base),
    )?;

    // End-to-end PredNet classifier on raw UCF-101 frames.
    reg.register(
        "prednet_finetuned_moments_full__ucf_01",
        raw(&[
            (
                "description",
                "End-to-end PredNet classifier on UCF-101 frames".into(),
            ),
            ("task", "full".into()),
            ("seq_length", 10usize.into()),
            ("n_timesteps", 10usize.into()),
            ("min_seq_length", 5usize.into()),
            ("sample_step", 3usize.into()),
            ("input_channels", 3usize.into()),
            ("input_height", 128usize.into()),
            ("input_width", 160usize.into()),
            ("data_format", "channels_first".into()),
            ("rescale", (1.0 / 255.0).into()),
            ("batch_size", 10usize.into()),
            ("pad_sequences", true.into()),
            ("model_type", "multistream".into()),
            ("hidden_dims", ConfigValue::IntList(vec![64])),
            ("dropout", 0.5.into()),
            ("average_predictions", true.into()),
            ("training_max_per_class", 0.9.into()),
            ("training_index_start", 0usize.into()),
            ("validation_index_start", 0.9.into()),
            ("test_max_per_class", ConfigValue::None),
            ("test_index_start", 0usize.into()),
            (
                "training_data_dir",
                format!("{UCF_DATA_DIR}/train_01").into(),
            ),
            (
                "validation_data_dir",
                format!("{UCF_DATA_DIR}/train_01").into(),
            ),
            ("test_data_dir", format!("{UCF_DATA_DIR}/test_01").into()),
            (
                "model_weights_file",
                "../prednet/results/prednet_kitti__moments__model__full/weights.ckpt".into(),
            ),
        ]),
        Some(&prednet_base),
    )?;

    Ok(reg)
}
