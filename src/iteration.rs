//! Progress through the training schedule.

use log::info;

use crate::corpus::Corpus;
use crate::parameter::WordToVecParameter;
use crate::real;

/// Number of words that must be processed between learning rate updates.
const ALPHA_UPDATE_INTERVAL: u64 = 10_000;

/// What [`Iteration::sentence_update`] crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Moved to the next word of the same sentence.
    Word,
    /// Moved to the first word of the next sentence.
    Sentence,
    /// Finished a pass over the corpus. The corpus has been reshuffled and
    /// the cursor is on its first sentence.
    Epoch,
}

/// Cursor over `(epoch, sentence, position)` plus the annealed learning rate.
#[derive(Clone, Debug)]
pub struct Iteration {
    /// Words in the sentences finished so far this epoch.
    word_count: u64,
    /// `word_count` at the last learning rate update.
    last_word_count: u64,
    /// Words processed over the whole run, as of the last update.
    word_count_actual: u64,
    iteration_count: usize,
    sentence_index: usize,
    sentence_position: usize,
    starting_alpha: real,
    alpha: real,
    number_of_iterations: usize,
    corpus_word_count: u64,
    seed: u64,
}

impl Iteration {
    pub fn new<C: Corpus + ?Sized>(corpus: &C, parameter: &WordToVecParameter) -> Self {
        Iteration {
            word_count: 0,
            last_word_count: 0,
            word_count_actual: 0,
            iteration_count: 0,
            sentence_index: 0,
            sentence_position: 0,
            starting_alpha: parameter.alpha(),
            alpha: parameter.alpha(),
            number_of_iterations: parameter.number_of_iterations(),
            corpus_word_count: corpus.number_of_words(),
            seed: parameter.seed(),
        }
    }

    pub fn alpha(&self) -> real {
        self.alpha
    }

    pub fn starting_alpha(&self) -> real {
        self.starting_alpha
    }

    /// Number of completed passes over the corpus.
    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    pub fn sentence_index(&self) -> usize {
        self.sentence_index
    }

    pub fn sentence_position(&self) -> usize {
        self.sentence_position
    }

    pub fn word_count_actual(&self) -> u64 {
        self.word_count_actual
    }

    /// Number of words the whole schedule will process.
    pub fn total_words(&self) -> u64 {
        self.number_of_iterations as u64 * self.corpus_word_count
    }

    pub fn is_finished(&self) -> bool {
        self.iteration_count >= self.number_of_iterations
    }

    /// Decay the learning rate once more than 10,000 words have been
    /// processed since the last decay. The rate falls linearly over the whole
    /// schedule and never drops below `starting_alpha * 0.0001`.
    ///
    /// Returns true if the rate was updated.
    pub fn alpha_update(&mut self) -> bool {
        if self.word_count - self.last_word_count <= ALPHA_UPDATE_INTERVAL {
            return false;
        }
        self.word_count_actual += self.word_count - self.last_word_count;
        self.last_word_count = self.word_count;
        self.alpha = self.starting_alpha
            * (1.0 - self.word_count_actual as real / (self.total_words() + 1) as real);
        if self.alpha < self.starting_alpha * 0.0001 {
            self.alpha = self.starting_alpha * 0.0001;
        }
        true
    }

    /// Advance to the next word of the corpus.
    ///
    /// At the end of a sentence this moves to the start of the next one. At
    /// the end of the last sentence it completes an epoch: the within-epoch
    /// counters reset and the corpus is reshuffled with the configured seed.
    ///
    /// Panics if the corpus has no sentences.
    pub fn sentence_update<C: Corpus + ?Sized>(&mut self, corpus: &mut C) -> Step {
        let current_len = corpus.sentence(self.sentence_index).word_count();
        self.sentence_position += 1;
        if self.sentence_position < current_len {
            return Step::Word;
        }

        self.word_count += current_len as u64;
        self.sentence_index += 1;
        self.sentence_position = 0;
        if self.sentence_index < corpus.sentence_count() {
            return Step::Sentence;
        }

        self.iteration_count += 1;
        self.word_count = 0;
        self.last_word_count = 0;
        self.sentence_index = 0;
        corpus.shuffle_sentences(self.seed);
        info!(
            "finished epoch {} of {}, alpha {}",
            self.iteration_count, self.number_of_iterations, self.alpha
        );
        Step::Epoch
    }
}
