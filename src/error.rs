use std::io;

use thiserror::Error;

use crate::MAX_CODE_LENGTH;

#[derive(Error, Debug)]
pub enum Error {
    /// The corpus supplied no distinct words.
    #[error("cannot build a vocabulary from a corpus with no words")]
    EmptyVocabulary,

    /// The corpus supplied no sentences to train on.
    #[error("cannot train on a corpus with no sentences")]
    EmptyCorpus,

    #[error("word {0:?} has an occurrence count of zero")]
    ZeroCount(String),

    /// A sentence token that the vocabulary does not know. The corpus and
    /// the vocabulary built from it must agree.
    #[error("word {0:?} does not appear in the vocabulary")]
    UnknownWord(String),

    #[error("Huffman code for {word:?} is {length} bits long; the limit is {MAX_CODE_LENGTH}")]
    CodeTooLong { word: String, length: usize },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid vector file: {0}")]
    InvalidVectorFile(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
