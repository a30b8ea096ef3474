use indicatif::{ProgressBar, ProgressStyle};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use recurrent_goldens::prelude::*;
use recurrent_goldens::recorder::DEFAULT_SEED;
use std::path::PathBuf;

/// Global-norm limit used by the `_clipped` fixtures.
const CLIP_MAX_NORM: f32 = 1.0;

/// Number of train steps every artifact records.
const ITERATIONS: usize = 2;

fn weight_rng() -> StdRng {
    StdRng::seed_from_u64(DEFAULT_SEED)
}

fn run(
    pb: &ProgressBar,
    name: &str,
    model: &mut dyn RecurrentModel,
    options: RecordOptions,
) -> Result<(), RecordError> {
    pb.set_message(name.to_string());
    record(name, model, &options)?;
    pb.inc(1);
    Ok(())
}

/// Encodes a zoneout rate the way the artifact names do: 0.5 -> "050".
fn rate_tag(rate: f64) -> String {
    format!("{:03}", (rate * 100.0).round() as u32)
}

fn main() -> Result<(), RecordError> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let zoneout_rates = [0.0, 0.5, 1.0];
    let total = 3 + 2 + 2 + 2 * zoneout_rates.len() * zoneout_rates.len() + 2;
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let fc_dims = |clip: bool| {
        let options = RecordOptions::new(ITERATIONS, vec![vec![1, 1]], vec![vec![1, 1]])
            .with_out_dir(out_dir.clone());
        if clip {
            options.with_clip(CLIP_MAX_NORM)
        } else {
            options
        }
    };
    let wide_dims = || {
        RecordOptions::new(ITERATIONS, vec![vec![3, 2]], vec![vec![3, 2, 2]])
            .with_out_dir(out_dir.clone())
    };
    let zoneout_dims = || {
        RecordOptions::new(ITERATIONS, vec![vec![1, 2]], vec![vec![1, 2, 2]])
            .with_out_dir(out_dir.clone())
    };

    run(
        &pb,
        "fc_unroll_single",
        &mut FcUnroll::new(5, 1, &mut weight_rng()),
        fc_dims(false),
    )?;
    run(
        &pb,
        "fc_unroll_stacked",
        &mut FcUnroll::new(2, 2, &mut weight_rng()),
        fc_dims(false),
    )?;
    run(
        &pb,
        "fc_unroll_stacked_clipped",
        &mut FcUnroll::new(2, 2, &mut weight_rng()),
        fc_dims(true),
    )?;

    run(
        &pb,
        "rnncell_single",
        &mut RnnCellStacked::new(2, 1, 2, 2, &mut weight_rng()),
        wide_dims(),
    )?;
    run(
        &pb,
        "rnncell_stacked",
        &mut RnnCellStacked::new(2, 2, 2, 2, &mut weight_rng()),
        wide_dims(),
    )?;

    run(
        &pb,
        "lstm_single",
        &mut LstmStacked::new(2, 1, &mut weight_rng()),
        wide_dims(),
    )?;
    run(
        &pb,
        "lstm_stacked",
        &mut LstmStacked::new(2, 2, &mut weight_rng()),
        wide_dims(),
    )?;

    for cell_rate in zoneout_rates {
        for hidden_rate in zoneout_rates {
            for (variant, num_cells) in [("single", 1), ("stacked", 2)] {
                let name = format!(
                    "zoneout_lstm_{}_{}_{}",
                    variant,
                    rate_tag(hidden_rate),
                    rate_tag(cell_rate)
                );
                let mut model = ZoneoutLstmStacked::new(
                    1,
                    2,
                    num_cells,
                    hidden_rate,
                    cell_rate,
                    &mut weight_rng(),
                )?;
                run(&pb, &name, &mut model, zoneout_dims())?;
            }
        }
    }

    run(
        &pb,
        "grucell_single",
        &mut GruCellStacked::new(2, 1, &mut weight_rng()),
        wide_dims(),
    )?;
    run(
        &pb,
        "grucell_stacked",
        &mut GruCellStacked::new(2, 2, &mut weight_rng()),
        wide_dims(),
    )?;

    pb.finish_with_message("done");
    Ok(())
}
