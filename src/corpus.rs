//! Training text: sentences of word tokens plus per-word occurrence counts.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::info;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::MAX_SENTENCE_LENGTH;

/// What training needs from a body of text.
pub trait Corpus {
    /// Every distinct word together with the number of times it occurs.
    fn distinct_words_with_counts(&self) -> Vec<(String, u64)>;

    fn sentence_count(&self) -> usize;

    /// Total number of word tokens over all sentences.
    fn number_of_words(&self) -> u64;

    /// Get sentence `index`. Panics if `index >= self.sentence_count()`.
    fn sentence(&self, index: usize) -> &Sentence;

    /// Reorder the sentences. The same seed applied to the same order always
    /// produces the same new order.
    fn shuffle_sentences(&mut self, seed: u64);
}

/// An ordered sequence of word tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sentence {
    words: Vec<String>,
}

impl Sentence {
    pub fn new(words: Vec<String>) -> Self {
        Sentence { words }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Get the word at `index`, or `None` if it's out of range.
    pub fn word(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// True if `index` names a word of this sentence. Takes a signed index so
    /// that window arithmetic can run off the front of the sentence.
    pub fn safe_index(&self, index: isize) -> bool {
        index >= 0 && (index as usize) < self.words.len()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Sentence {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Sentence::new(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Sentence {
    /// Split a line of text on whitespace.
    fn from(line: &str) -> Self {
        line.split_whitespace().collect()
    }
}

/// A corpus held entirely in memory.
#[derive(Clone, Debug)]
pub struct TextCorpus {
    sentences: Vec<Sentence>,
    counts: BTreeMap<String, u64>,
    number_of_words: u64,
}

impl TextCorpus {
    /// Build a corpus from sentences, keeping every word. Empty sentences are
    /// dropped.
    pub fn new<I>(sentences: I) -> Self
    where
        I: IntoIterator<Item = Sentence>,
    {
        Self::with_min_count(sentences, 1)
    }

    /// Build a corpus from sentences, discarding words that occur fewer than
    /// `min_count` times. Sentences left with no words are dropped.
    pub fn with_min_count<I>(sentences: I, min_count: u64) -> Self
    where
        I: IntoIterator<Item = Sentence>,
    {
        let mut sentences: Vec<Sentence> = sentences.into_iter().collect();

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for word in sentences.iter().flat_map(|s| s.words.iter()) {
            *counts.entry(word.clone()).or_insert(0) += 1;
        }

        if min_count > 1 {
            counts.retain(|_, count| *count >= min_count);
            for sentence in &mut sentences {
                sentence.words.retain(|w| counts.contains_key(w));
            }
        }
        sentences.retain(|s| !s.is_empty());

        let number_of_words = sentences.iter().map(|s| s.word_count() as u64).sum();
        TextCorpus {
            sentences,
            counts,
            number_of_words,
        }
    }

    /// Read training text, one sentence per line, words separated by
    /// whitespace. Lines longer than `MAX_SENTENCE_LENGTH` words are split.
    pub fn from_reader<R: BufRead>(reader: R, min_count: u64) -> io::Result<Self> {
        let mut sentences = vec![];
        for line in reader.lines() {
            let line = line?;
            let words: Vec<&str> = line.split_whitespace().collect();
            for chunk in words.chunks(MAX_SENTENCE_LENGTH) {
                sentences.push(chunk.iter().copied().collect());
            }
        }
        Ok(Self::with_min_count(sentences, min_count))
    }

    pub fn from_file(path: &Path, min_count: u64) -> Result<Self> {
        let corpus = Self::from_reader(BufReader::new(File::open(path)?), min_count)?;
        info!(
            "read {} sentences, {} words, {} distinct words from {}",
            corpus.sentence_count(),
            corpus.number_of_words(),
            corpus.counts.len(),
            path.display()
        );
        Ok(corpus)
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Number of occurrences of `word`, or 0 if it is not in the corpus.
    pub fn count(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }
}

impl Corpus for TextCorpus {
    fn distinct_words_with_counts(&self) -> Vec<(String, u64)> {
        self.counts
            .iter()
            .map(|(word, &count)| (word.clone(), count))
            .collect()
    }

    fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    fn number_of_words(&self) -> u64 {
        self.number_of_words
    }

    fn sentence(&self, index: usize) -> &Sentence {
        &self.sentences[index]
    }

    fn shuffle_sentences(&mut self, seed: u64) {
        self.sentences.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    }
}
