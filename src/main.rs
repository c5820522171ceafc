use anyhow::{ensure, Result};
use clap::Parser;
use ndarray::{s, Array2, Array4, ArrayView2, Axis};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use ndpool::{max_pool2d, PoolOptions, PoolParam};

/// Max-pool a seeded random feature map and check it against a naive reference
#[derive(Parser, Debug)]
#[command(name = "ndpool")]
#[command(version)]
struct Args {
    /// Seed for the standard-normal input
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = 6)]
    height: usize,

    #[arg(long, default_value_t = 6)]
    width: usize,

    /// Kernel size, e.g. `2` or `(2, 3)`
    #[arg(long, default_value = "2")]
    kernel: PoolParam,

    /// Stride; defaults to the kernel size
    #[arg(long)]
    stride: Option<PoolParam>,

    #[arg(long, default_value = "0")]
    padding: PoolParam,

    #[arg(long, default_value = "1")]
    dilation: PoolParam,
}

/// Nested-loop max pooling of one plane with square kernel, stride and padding.
fn naive_max_pool2d(
    input: &ArrayView2<f32>,
    kernel: usize,
    stride: usize,
    padding: usize,
) -> Array2<f32> {
    let (h, w) = input.dim();
    let mut padded = Array2::from_elem((h + 2 * padding, w + 2 * padding), f32::NEG_INFINITY);
    padded
        .slice_mut(s![padding..padding + h, padding..padding + w])
        .assign(input);

    let out_h = (h + 2 * padding - kernel) / stride + 1;
    let out_w = (w + 2 * padding - kernel) / stride + 1;
    let mut output = Array2::<f32>::zeros((out_h, out_w));
    for i in 0..out_h {
        for j in 0..out_w {
            let window = padded.slice(s![
                i * stride..i * stride + kernel,
                j * stride..j * stride + kernel
            ]);
            output[[i, j]] = window.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        }
    }
    output
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let x: Array4<f32> =
        Array4::random_using((1, 1, args.height, args.width), StandardNormal, &mut rng);
    let plane = x.index_axis(Axis(0), 0).index_axis_move(Axis(0), 0);
    println!("Input:\n{:.4}", plane);

    let mut options = PoolOptions::new(args.kernel.clone())
        .padding(args.padding.clone())
        .dilation(args.dilation.clone())
        .return_indices(true);
    options.stride = args.stride.clone();
    tracing::info!(
        kernel = %args.kernel,
        padding = %args.padding,
        dilation = %args.dilation,
        "pooling"
    );
    let pooled = max_pool2d(&x, &options)?;
    println!("\nMaxPool2d output:\n{:.4}", pooled.values);
    if let Some(indices) = &pooled.indices {
        println!("Indices shape: {:?}", indices.shape());
    }

    // Self-test: 3x3 window, stride 1, padding 1, checked against the naive loop.
    let options = PoolOptions::new((3, 3)).stride((1, 1)).padding((1, 1)).return_indices(true);
    let pooled = max_pool2d(&x, &options)?;
    let indices_shape = pooled.indices.as_ref().map(|indices| indices.shape().to_vec());
    println!("\nMaxPool2d (3x3, stride 1, pad 1) output shape: {:?}", pooled.values.shape());
    println!("Indices shape: {:?}", indices_shape.unwrap_or_default());

    let reference = naive_max_pool2d(&plane, 3, 1, 1);
    let ours = pooled.values.index_axis(Axis(0), 0).index_axis_move(Axis(0), 0);
    ensure!(
        ours.shape() == reference.shape(),
        "shape mismatch: {:?} vs reference {:?}",
        ours.shape(),
        reference.shape()
    );
    let worst = ours
        .iter()
        .zip(reference.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    ensure!(worst <= 1e-6, "max_pool2d differs from the naive reference by {worst}");
    println!("\nmax_pool2d matches the naive reference.");
    Ok(())
}
