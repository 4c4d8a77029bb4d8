use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use wordtovec::{real, Corpus, NeuralNetwork, TextCorpus, Vocabulary, WordToVecParameter};

#[derive(Parser)]
struct Options {
    /// Use text data from FILE to train the model
    #[arg(long = "train", value_name = "FILE")]
    train_file: PathBuf,

    /// Use FILE to save the resulting word vectors / word clusters
    #[arg(long = "output", value_name = "FILE")]
    output_file: PathBuf,

    /// Set size of word vectors
    #[arg(long = "size", default_value_t = 100)]
    layer_size: usize,

    /// Set max skip length between words
    #[arg(long, default_value_t = 5)]
    window: usize,

    /// Use Hierarchical Softmax instead of negative sampling
    #[arg(long)]
    hs: bool,

    /// Number of negative examples; common values are 3 - 10
    #[arg(long, default_value_t = 5)]
    negative: usize,

    /// Number of passes over the training data
    #[arg(long, default_value_t = 3)]
    iter: usize,

    /// Discard words that appear less than N times
    #[arg(long = "min-count", value_name = "N", default_value_t = 5)]
    min_count: u64,

    /// Set the starting learning rate
    #[arg(long, default_value_t = 0.025)]
    alpha: real,

    /// Use the skip-gram model (otherwise, use continuous bag of words)
    #[arg(long)]
    skip_gram: bool,

    /// Seed for shuffling the training sentences
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Output word classes rather than word vectors; if unspecified, vectors are written instead
    #[arg(long, value_name = "K")]
    classes: Option<usize>,

    /// Save the resulting vectors in binary mode
    #[arg(long)]
    binary: bool,

    /// The vocabulary will be saved to FILE
    #[arg(long = "save-vocab", value_name = "FILE")]
    save_vocab_file: Option<PathBuf>,

    /// Log progress details
    #[arg(short, long)]
    verbose: bool,
}

fn save_vocab(vocabulary: &Vocabulary, vocab_file: &Path) -> Result<()> {
    let mut fo = BufWriter::new(
        File::create(vocab_file).context("error creating vocab file for write")?,
    );
    for vw in vocabulary.words() {
        writeln!(fo, "{} {}", vw.name(), vw.count()).context("error writing vocab file")?;
    }
    fo.flush().context("error writing vocab file")?;
    Ok(())
}

fn run(options: &Options) -> Result<()> {
    let parameter = WordToVecParameter::default()
        .with_layer_size(options.layer_size)
        .with_cbow(!options.skip_gram)
        .with_alpha(options.alpha)
        .with_window(options.window)
        .with_hierarchical_soft_max(options.hs)
        .with_negative_sampling_size(options.negative)
        .with_number_of_iterations(options.iter)
        .with_seed(options.seed);
    parameter.validate()?;
    if options.classes == Some(0) {
        bail!("--classes must be at least 1");
    }

    let corpus = TextCorpus::from_file(&options.train_file, options.min_count)
        .with_context(|| format!("error reading {}", options.train_file.display()))?;
    let total_words = corpus.number_of_words() * options.iter as u64;

    let network = NeuralNetwork::new(corpus, parameter)?;
    if let Some(f) = &options.save_vocab_file {
        save_vocab(network.vocabulary(), f)?;
    }

    let pb = ProgressBar::new(total_words);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} words ({percent}%) ETA: {eta}")
            .context("invalid progress bar template")?
            .progress_chars("=> "),
    );
    pb.set_message("Training...");
    let dictionary = network.train_with(|progress| {
        pb.set_position(progress.words_processed);
        pb.set_message(format!(
            "Epoch {}/{}  alpha {:.6}",
            progress.epoch, options.iter, progress.alpha
        ));
    })?;
    pb.finish_and_clear();

    let mut fo = BufWriter::new(
        File::create(&options.output_file).context("error creating output file")?,
    );
    match options.classes {
        None if options.binary => dictionary.write_binary(&mut fo),
        None => dictionary.write_text(&mut fo),
        Some(k) => {
            // Run K-means on the word vectors
            let classes = dictionary.word_classes(k, 10);
            dictionary.write_classes(&classes, &mut fo)
        }
    }
    .context("error writing output file")?;
    fo.flush().context("error writing output file")?;

    info!(
        "wrote {} words to {}",
        dictionary.len(),
        options.output_file.display()
    );
    Ok(())
}

fn main() {
    let options = Options::parse();

    let level = if options.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(&options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
