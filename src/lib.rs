//! Word embeddings with the word2vec family of models.
//!
//! A [`NeuralNetwork`] is built from a [`Corpus`] and a [`WordToVecParameter`]
//! record. Training walks the corpus sentence by sentence using either the
//! continuous bag-of-words or the skip-gram architecture, with a hierarchical
//! softmax or negative sampling output layer, and produces a
//! [`VectorizedDictionary`] mapping each vocabulary word to its vector.

pub mod corpus;
pub mod dictionary;
mod error;
pub mod iteration;
pub mod network;
pub mod parameter;
pub mod vocabulary;

pub use corpus::{Corpus, Sentence, TextCorpus};
pub use dictionary::VectorizedDictionary;
pub use error::{Error, Result};
pub use iteration::{Iteration, Step};
pub use network::{NeuralNetwork, Progress};
pub use parameter::WordToVecParameter;
pub use vocabulary::{HuffmanCode, Vocabulary, VocabularyWord};

#[allow(non_camel_case_types)]
pub type real = f32; // Precision of float numbers

/// Longest sentence `TextCorpus` will produce; longer lines are split.
pub const MAX_SENTENCE_LENGTH: usize = 1000;

/// Longest Huffman code a vocabulary word may carry.
pub const MAX_CODE_LENGTH: usize = 40;
