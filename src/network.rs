//! The two-layer word2vec network and its training loop.

use log::{debug, info};
use ndarray::prelude::*;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::corpus::Corpus;
use crate::dictionary::VectorizedDictionary;
use crate::error::{Error, Result};
use crate::iteration::{Iteration, Step};
use crate::parameter::WordToVecParameter;
use crate::real;
use crate::vocabulary::Vocabulary;

pub const EXP_TABLE_SIZE: usize = 1000;
pub const MAX_EXP: real = 6.0;

/// Table slots per unit of score. Integer arithmetic: 1000 / 6 / 2 == 83.
const EXP_TABLE_SCALE: real = (EXP_TABLE_SIZE / MAX_EXP as usize / 2) as real;

/// Precomputed values of the logistic function σ(x) = 1 / (1 + e^-x) for x
/// evenly spaced over `[-MAX_EXP, MAX_EXP]`.
#[derive(Clone, Debug)]
pub struct SigmoidTable {
    values: Vec<real>,
}

impl Default for SigmoidTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SigmoidTable {
    pub fn new() -> Self {
        let values = (0..=EXP_TABLE_SIZE)
            .map(|i| {
                let x = (i as f64 / EXP_TABLE_SIZE as f64 * 2.0 - 1.0) * MAX_EXP as f64;
                let e = x.exp(); // Precompute the exp() table
                (e / (e + 1.0)) as real // Precompute f(x) = x / (x + 1)
            })
            .collect();
        SigmoidTable { values }
    }

    pub fn values(&self) -> &[real] {
        &self.values
    }

    /// Approximate σ(f). Saturates to 0 and 1 outside the table.
    pub fn sigmoid(&self, f: real) -> real {
        if f >= MAX_EXP {
            1.0
        } else if f <= -MAX_EXP {
            0.0
        } else {
            self.values[((f + MAX_EXP) * EXP_TABLE_SCALE) as usize]
        }
    }

    /// The gradient `(label - σ(f)) * alpha` for a negative-sampling target.
    pub fn gradient(&self, f: real, alpha: real, label: real) -> real {
        if f > MAX_EXP {
            (label - 1.0) * alpha
        } else if f < -MAX_EXP {
            label * alpha
        } else {
            (label - self.values[((f + MAX_EXP) * EXP_TABLE_SCALE) as usize]) * alpha
        }
    }
}

/// Training progress, reported at every learning rate update and at the end
/// of every epoch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    /// Completed epochs.
    pub epoch: usize,
    pub words_processed: u64,
    pub total_words: u64,
    pub alpha: real,
}

impl Progress {
    fn new(iteration: &Iteration, words_processed: u64) -> Self {
        Progress {
            epoch: iteration.iteration_count(),
            words_processed,
            total_words: iteration.total_words(),
            alpha: iteration.alpha(),
        }
    }

    /// Fraction of the schedule done, from 0 to 1.
    pub fn fraction(&self) -> f64 {
        self.words_processed as f64 / self.total_words.max(1) as f64
    }
}

/// Hidden -> output half of the network.
#[derive(Debug)]
struct OutputLayer {
    /// With hierarchical softmax, row `n` scores internal Huffman node `n`;
    /// with negative sampling, row `w` scores word `w`.
    word_vector_update: Array2<real>,
    sigmoid: SigmoidTable,
    hierarchical_soft_max: bool,
    negative_sampling_size: usize,
}

impl OutputLayer {
    /// Train the output weights to predict `word` from `hidden`, adding the
    /// error propagated back to the hidden layer into `hidden_error`.
    fn learn<R: Rng>(
        &mut self,
        vocabulary: &Vocabulary,
        rng: &mut R,
        hidden: ArrayView1<'_, real>,
        word: usize,
        alpha: real,
        hidden_error: &mut Array1<real>,
    ) {
        if self.hierarchical_soft_max {
            let vw = vocabulary.word(word);
            for (&bit, &l2) in vw.code().iter().zip(vw.point()) {
                let mut output = self.word_vector_update.row_mut(l2);
                // Propagate hidden -> output
                let f = hidden.dot(&output);
                if f <= -MAX_EXP || f >= MAX_EXP {
                    continue;
                }
                // 'g' is the gradient (d/df loss) multiplied by the learning rate
                let g = (1.0 - bit as real - self.sigmoid.sigmoid(f)) * alpha;
                // Propagate errors output -> hidden
                hidden_error.scaled_add(g, &output);
                // Learn weights hidden -> output
                output.scaled_add(g, &hidden);
            }
        } else {
            for d in 0..=self.negative_sampling_size {
                let (target, label) = if d == 0 {
                    (word, 1.0)
                } else {
                    match negative_sample(rng, vocabulary, word) {
                        Some(target) => (target, 0.0),
                        None => continue,
                    }
                };
                let mut output = self.word_vector_update.row_mut(target);
                let f = hidden.dot(&output);
                let g = self.sigmoid.gradient(f, alpha, label);
                hidden_error.scaled_add(g, &output);
                output.scaled_add(g, &hidden);
            }
        }
    }
}

/// Draw a word from the unigram table to serve as a negative example for
/// `word`. Returns `None` if the draw hits `word` itself; the caller skips
/// that draw rather than retrying.
fn negative_sample<R: Rng>(rng: &mut R, vocabulary: &Vocabulary, word: usize) -> Option<usize> {
    let mut target = vocabulary.table_value(rng.gen_range(0..vocabulary.table_size()));
    if target == 0 && vocabulary.size() > 1 {
        target = rng.gen_range(1..vocabulary.size());
    }
    (target != word).then_some(target)
}

/// Sentence positions whose distance from `position` is at most
/// `window - b`, excluding `position` itself and anything outside the
/// sentence.
fn context_positions(
    position: usize,
    len: usize,
    window: usize,
    b: usize,
) -> impl Iterator<Item = usize> {
    (b..(window * 2 + 1 - b))
        .filter(move |&a| a != window)
        .filter_map(move |a| {
            let c = (position + a).checked_sub(window)?;
            (c < len).then_some(c)
        })
}

/// A word2vec training session.
///
/// Owns the corpus, the vocabulary built from it and both weight matrices.
/// [`train`](Self::train) consumes the session and returns the learned
/// vectors; the output-side weights are dropped with it.
pub struct NeuralNetwork<C> {
    corpus: C,
    parameter: WordToVecParameter,
    vocabulary: Vocabulary,
    /// The learned word vectors, one row per vocabulary word.
    word_vectors: Array2<real>,
    output: OutputLayer,
    /// Source for window sizes and negative samples. Not seeded.
    rng: StdRng,
    /// Hidden layer activation.
    neu1: Array1<real>,
    /// Error propagated back to the hidden layer.
    neu1e: Array1<real>,
    /// Rows of the current example's context words.
    context: Vec<usize>,
}

impl<C: Corpus> NeuralNetwork<C> {
    /// Build the vocabulary of `corpus` and initialize the network: word
    /// vectors uniformly random in `[-0.5, 0.5)`, output weights zero.
    pub fn new(corpus: C, parameter: WordToVecParameter) -> Result<Self> {
        parameter.validate()?;
        if corpus.sentence_count() == 0 {
            return Err(Error::EmptyCorpus);
        }
        let vocabulary = Vocabulary::new(&corpus)?;

        let vocab_size = vocabulary.size();
        let layer_size = parameter.layer_size();
        let window = parameter.window();
        let word_vectors = Array::random((vocab_size, layer_size), Uniform::new(-0.5, 0.5));
        let output = OutputLayer {
            word_vector_update: Array2::zeros((vocab_size, layer_size)),
            sigmoid: SigmoidTable::new(),
            hierarchical_soft_max: parameter.is_hierarchical_soft_max(),
            negative_sampling_size: parameter.negative_sampling_size(),
        };

        Ok(NeuralNetwork {
            corpus,
            parameter,
            vocabulary,
            word_vectors,
            output,
            rng: StdRng::from_entropy(),
            neu1: Array1::zeros(layer_size),
            neu1e: Array1::zeros(layer_size),
            context: Vec::with_capacity(2 * window),
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn parameter(&self) -> &WordToVecParameter {
        &self.parameter
    }

    pub fn word_vectors(&self) -> ArrayView2<'_, real> {
        self.word_vectors.view()
    }

    pub fn train(self) -> Result<VectorizedDictionary> {
        self.train_with(|_| {})
    }

    /// Train, calling `report` at every learning rate update and at the end
    /// of every epoch.
    pub fn train_with<F>(mut self, mut report: F) -> Result<VectorizedDictionary>
    where
        F: FnMut(Progress),
    {
        info!(
            "training {} with {} on {} sentences ({} words), vocabulary of {} words, {} dimensions",
            if self.parameter.is_cbow() { "CBOW" } else { "skip-gram" },
            if self.parameter.is_hierarchical_soft_max() {
                "hierarchical softmax".to_string()
            } else {
                format!("{} negative samples", self.parameter.negative_sampling_size())
            },
            self.corpus.sentence_count(),
            self.corpus.number_of_words(),
            self.vocabulary.size(),
            self.parameter.layer_size(),
        );

        self.corpus.shuffle_sentences(self.parameter.seed());
        let mut iteration = Iteration::new(&self.corpus, &self.parameter);
        let mut sentence: Vec<usize> = vec![];
        self.resolve_sentence(iteration.sentence_index(), &mut sentence)?;

        while !iteration.is_finished() {
            if iteration.alpha_update() {
                debug!(
                    "alpha {} after {} words",
                    iteration.alpha(),
                    iteration.word_count_actual()
                );
                report(Progress::new(&iteration, iteration.word_count_actual()));
            }

            if !sentence.is_empty() {
                let position = iteration.sentence_position();
                if self.parameter.is_cbow() {
                    self.train_cbow(&sentence, position, iteration.alpha());
                } else {
                    self.train_skip_gram(&sentence, position, iteration.alpha());
                }
            }

            match iteration.sentence_update(&mut self.corpus) {
                Step::Word => {}
                Step::Sentence => {
                    self.resolve_sentence(iteration.sentence_index(), &mut sentence)?;
                }
                Step::Epoch => {
                    let words = iteration.iteration_count() as u64 * self.corpus.number_of_words();
                    report(Progress::new(&iteration, words));
                    if !iteration.is_finished() {
                        self.resolve_sentence(iteration.sentence_index(), &mut sentence)?;
                    }
                }
            }
        }

        Ok(self.into_dictionary())
    }

    /// Map the words of sentence `index` to vocabulary rows.
    fn resolve_sentence(&self, index: usize, rows: &mut Vec<usize>) -> Result<()> {
        rows.clear();
        for word in self.corpus.sentence(index).words() {
            let row = self
                .vocabulary
                .position(word)
                .ok_or_else(|| Error::UnknownWord(word.to_string()))?;
            rows.push(row);
        }
        Ok(())
    }

    /// One continuous bag-of-words example: predict `sentence[position]` from
    /// the average of its context vectors.
    fn train_cbow(&mut self, sentence: &[usize], position: usize, alpha: real) {
        let window = self.parameter.window();
        let word = sentence[position];
        let b = self.rng.gen_range(0..window);

        self.context.clear();
        self.context
            .extend(context_positions(position, sentence.len(), window, b).map(|c| sentence[c]));
        if self.context.is_empty() {
            return;
        }

        // in -> hidden
        self.neu1.fill(0.0);
        for &row in &self.context {
            self.neu1 += &self.word_vectors.row(row);
        }
        self.neu1 /= self.context.len() as real;

        self.neu1e.fill(0.0);
        self.output.learn(
            &self.vocabulary,
            &mut self.rng,
            self.neu1.view(),
            word,
            alpha,
            &mut self.neu1e,
        );

        // hidden -> in: the one accumulated error goes to every context word
        for &row in &self.context {
            let mut input = self.word_vectors.row_mut(row);
            input += &self.neu1e;
        }
    }

    /// One skip-gram example: predict `sentence[position]` from each context
    /// word separately.
    fn train_skip_gram(&mut self, sentence: &[usize], position: usize, alpha: real) {
        let window = self.parameter.window();
        let word = sentence[position];
        let b = self.rng.gen_range(0..window);

        for c in context_positions(position, sentence.len(), window, b) {
            let l1 = sentence[c];
            self.neu1e.fill(0.0);
            self.output.learn(
                &self.vocabulary,
                &mut self.rng,
                self.word_vectors.row(l1),
                word,
                alpha,
                &mut self.neu1e,
            );

            // Learn weights input -> hidden
            let mut input = self.word_vectors.row_mut(l1);
            input += &self.neu1e;
        }
    }

    fn into_dictionary(self) -> VectorizedDictionary {
        let names = self
            .vocabulary
            .words()
            .iter()
            .map(|vw| vw.name().to_string())
            .collect();
        VectorizedDictionary::new(names, self.word_vectors)
    }
}
