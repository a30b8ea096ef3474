use crate::golden::{GoldenManifest, GoldenWriter, SectionKind};
use crate::model::{RecurrentModel, Tensor};
use crate::RecordError;
use ndarray::{Array, IxDyn};
use ndarray_rand::RandomExt;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::StandardNormal;
use std::path::PathBuf;

/// Seed every fixture run derives its randomness from unless overridden, so
/// regenerated goldens are byte-identical across runs.
pub const DEFAULT_SEED: u64 = 42;

/// Learning rate of the recording SGD step.
pub const DEFAULT_LEARNING_RATE: f32 = 0.1;

/// Configuration of one recording run.
///
/// # Fields
///
/// - `iterations` - number of train steps to record
/// - `input_dims` / `label_dims` - full shapes (batch included) of the
///   synthetic tensors sampled per iteration
/// - `learning_rate` - SGD step size
/// - `clip_grad_norm` - when set, gradients are rescaled so their global L2
///   norm does not exceed this value
/// - `seed` - seed of the synthetic-data RNG
/// - `out_dir` - directory the artifact pair is written into
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub iterations: usize,
    pub input_dims: Vec<Vec<usize>>,
    pub label_dims: Vec<Vec<usize>>,
    pub learning_rate: f32,
    pub clip_grad_norm: Option<f32>,
    pub seed: u64,
    pub out_dir: PathBuf,
}

impl RecordOptions {
    pub fn new(iterations: usize, input_dims: Vec<Vec<usize>>, label_dims: Vec<Vec<usize>>) -> Self {
        Self {
            iterations,
            input_dims,
            label_dims,
            learning_rate: DEFAULT_LEARNING_RATE,
            clip_grad_norm: None,
            seed: DEFAULT_SEED,
            out_dir: PathBuf::from("."),
        }
    }

    pub fn with_clip(mut self, max_norm: f32) -> Self {
        self.clip_grad_norm = Some(max_norm);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_out_dir(mut self, out_dir: PathBuf) -> Self {
        self.out_dir = out_dir;
        self
    }
}

fn sample_tensors<R: Rng + ?Sized>(dims: &[Vec<usize>], rng: &mut R) -> Vec<Tensor> {
    dims.iter()
        .map(|d| Array::random_using(IxDyn(d), StandardNormal, rng))
        .collect()
}

/// Global L2 norm over a set of named gradients.
pub fn global_grad_norm(grads: &[(String, Tensor)]) -> f32 {
    grads
        .iter()
        .map(|(_, g)| g.iter().map(|v| v * v).sum::<f32>())
        .sum::<f32>()
        .sqrt()
}

/// Runs `options.iterations` train steps of `model` and records the golden
/// artifact pair `<name>.nnmodelgolden` / `<name>.json`.
///
/// Per-iteration recording order: inputs, labels, weights (pre-update),
/// forward output, gradients (post-clip), loss. Weights are captured before
/// the SGD step so the harness can replay the step itself.
pub fn record(
    name: &str,
    model: &mut dyn RecurrentModel,
    options: &RecordOptions,
) -> Result<GoldenManifest, RecordError> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut writer = GoldenWriter::create(&options.out_dir, name).map_err(RecordError::Io)?;

    for iteration in 0..options.iterations {
        model.zero_gradients();
        let inputs = sample_tensors(&options.input_dims, &mut rng);
        let labels = sample_tensors(&options.label_dims, &mut rng);

        for (idx, input) in inputs.iter().enumerate() {
            writer.push_tensor(iteration, SectionKind::Input, &format!("input{}", idx), input)?;
        }
        for (idx, label) in labels.iter().enumerate() {
            writer.push_tensor(iteration, SectionKind::Label, &format!("label{}", idx), label)?;
        }
        for (param_name, value) in model.parameters() {
            writer.push_tensor(iteration, SectionKind::Weight, &param_name, &value)?;
        }

        let (output, loss) = model.forward(&inputs, &labels);
        writer.push_tensor(iteration, SectionKind::Output, "output", &output)?;

        model.backward()?;

        if let Some(max_norm) = options.clip_grad_norm {
            let norm = global_grad_norm(&model.gradients());
            if norm > max_norm {
                model.scale_gradients(max_norm / (norm + f32::EPSILON));
            }
        }

        for (param_name, grad) in model.gradients() {
            writer.push_tensor(iteration, SectionKind::Gradient, &param_name, &grad)?;
        }

        model.apply_gradients(options.learning_rate);
        writer.push_scalar(iteration, SectionKind::Loss, "loss", loss)?;
    }

    Ok(writer.finish()?)
}
