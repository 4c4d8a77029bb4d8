//! Trained word vectors: lookup, similarity queries, clustering and the
//! word2vec file formats.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use log::info;
use ndarray::prelude::*;
use ndarray::{Data, DataMut};
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::real;

pub fn norm<S: Data<Elem = real>>(v: &ArrayBase<S, Ix1>) -> real {
    v.dot(v).sqrt()
}

/// Scale `v` to unit length. A zero vector is left alone.
pub fn normalize<S: DataMut<Elem = real>>(v: &mut ArrayBase<S, Ix1>) {
    let len = norm(v);
    if len > 0.0 {
        *v /= len;
    }
}

/// Word vectors in vocabulary order.
#[derive(Clone, Debug)]
pub struct VectorizedDictionary {
    words: Vec<String>,
    index: HashMap<String, usize>,
    /// Row `k` is the vector for `words[k]`.
    vectors: Array2<real>,
}

impl VectorizedDictionary {
    /// Panics if the number of words and rows disagree.
    pub fn new(words: Vec<String>, vectors: Array2<real>) -> Self {
        assert_eq!(words.len(), vectors.nrows());
        let index = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
        VectorizedDictionary {
            words,
            index,
            vectors,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns the vector size.
    pub fn size(&self) -> usize {
        self.vectors.ncols()
    }

    /// Get the index for a word. Exact match only, case-sensitive.
    pub fn position(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    /// Get the word for a word-index. Panics if `index` is out of range.
    pub fn word(&self, index: usize) -> &str {
        &self.words[index]
    }

    /// Panics if `index` is out of range.
    pub fn vector(&self, index: usize) -> ArrayView1<'_, real> {
        self.vectors.row(index)
    }

    pub fn get(&self, word: &str) -> Option<ArrayView1<'_, real>> {
        self.position(word).map(|i| self.vector(i))
    }

    pub fn vectors(&self) -> ArrayView2<'_, real> {
        self.vectors.view()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ArrayView1<'_, real>)> + '_ {
        self.words
            .iter()
            .map(String::as_str)
            .zip(self.vectors.outer_iter())
    }

    /// Scale every vector to unit length, so that dot products are cosine
    /// similarities.
    pub fn normalize(&mut self) {
        for mut row in self.vectors.outer_iter_mut() {
            normalize(&mut row);
        }
    }

    fn lookup(&self, word: &str) -> Result<usize> {
        self.position(word)
            .ok_or_else(|| Error::UnknownWord(word.to_string()))
    }

    /// The `n` words closest by cosine similarity to the sum of `words`, best
    /// first. The query words themselves are never returned.
    pub fn most_similar(&self, words: &[&str], n: usize) -> Result<Vec<(&str, real)>> {
        let bi = words
            .iter()
            .map(|w| self.lookup(w))
            .collect::<Result<Vec<usize>>>()?;
        let mut query: Array1<real> = Array1::zeros(self.size());
        for &i in &bi {
            query += &self.vector(i);
        }
        Ok(self.nearest(query, &bi, n))
    }

    /// Answer "`a` is to `b` as `c` is to ?": the `n` words closest to
    /// `b - a + c`, best first, excluding the three query words.
    pub fn analogy(&self, a: &str, b: &str, c: &str, n: usize) -> Result<Vec<(&str, real)>> {
        let bi = [self.lookup(a)?, self.lookup(b)?, self.lookup(c)?];
        let query = &self.vector(bi[1]) - &self.vector(bi[0]) + &self.vector(bi[2]);
        Ok(self.nearest(query, &bi, n))
    }

    fn nearest(&self, mut query: Array1<real>, exclude: &[usize], n: usize) -> Vec<(&str, real)> {
        normalize(&mut query);
        let mut best: Vec<(usize, real)> = self
            .vectors
            .axis_iter(Axis(0))
            .into_par_iter()
            .enumerate()
            .filter(|(c, _)| !exclude.contains(c))
            .map(|(c, row)| {
                let len = norm(&row);
                let dist = if len > 0.0 { query.dot(&row) / len } else { 0.0 };
                (c, dist)
            })
            .collect();
        best.sort_by_key(|&(_, dist)| Reverse(OrderedFloat(dist)));
        best.truncate(n);
        best.into_iter()
            .map(|(c, dist)| (self.word(c), dist))
            .collect()
    }

    /// Cluster the vectors into `k` classes with k-means, using dot-product
    /// similarity to length-normalized class centers. Returns the class of
    /// each word. Panics if `k` is zero.
    pub fn word_classes(&self, k: usize, iterations: usize) -> Vec<usize> {
        assert!(k > 0, "need at least one class");
        let mut classes: Vec<usize> = (0..self.len()).map(|a| a % k).collect();
        let mut centers = Array2::<real>::zeros((k, self.size()));
        let mut counts = vec![0usize; k];

        for _ in 0..iterations {
            // Sum of vectors in each class; counts start at 1
            centers.fill(0.0);
            counts.fill(1);
            for (row, &class) in self.vectors.outer_iter().zip(&classes) {
                let mut center = centers.row_mut(class);
                center += &row;
                counts[class] += 1;
            }

            for (mut center, &count) in centers.outer_iter_mut().zip(&counts) {
                center /= count as real;
                normalize(&mut center);
            }

            // Move vectors to nearest class. Ties go to the lowest class.
            classes = self
                .vectors
                .axis_iter(Axis(0))
                .into_par_iter()
                .map(|row| {
                    let mut closev: real = -10.0;
                    let mut closeid = 0;
                    for (d, center) in centers.outer_iter().enumerate() {
                        let x = center.dot(&row);
                        if x > closev {
                            closev = x;
                            closeid = d;
                        }
                    }
                    closeid
                })
                .collect();
        }
        classes
    }

    /// Write `"<words> <size>"`, then one line per word: the word and its
    /// components as decimal text.
    pub fn write_text<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{} {}", self.len(), self.size())?;
        for (word, vector) in self.iter() {
            write!(out, "{word} ")?;
            for f in vector {
                write!(out, "{f} ")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Like [`write_text`](Self::write_text), but each vector is written as
    /// little-endian `f32` bytes.
    pub fn write_binary<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{} {}", self.len(), self.size())?;
        for (word, vector) in self.iter() {
            write!(out, "{word} ")?;
            let bits: Vec<u32> = vector.iter().map(|f| f.to_bits().to_le()).collect();
            out.write_all(bytemuck::cast_slice::<u32, u8>(&bits))?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Write one `"<word> <class>"` line per word.
    pub fn write_classes<W: Write>(&self, classes: &[usize], mut out: W) -> Result<()> {
        for (word, class) in self.words.iter().zip(classes) {
            writeln!(out, "{word} {class}")?;
        }
        Ok(())
    }

    /// Read vectors in the binary format written by
    /// [`write_binary`](Self::write_binary), normalizing each one.
    ///
    /// Rows are read one at a time, so a header that promises more data than
    /// the input holds is an error rather than a large allocation.
    pub fn load<R: BufRead>(mut f: R) -> Result<Self> {
        let invalid = |what: &str| Error::InvalidVectorFile(what.to_string());

        let mut line = String::new();
        f.read_line(&mut line)?;
        let mut fields = line.split_whitespace();
        let num_words: usize = fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| invalid("header must start with the number of words"))?;
        let size: usize = fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| invalid("header must give the vector size"))?;
        let row_bytes = size
            .checked_mul(std::mem::size_of::<real>())
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(|| invalid("vector size is too large"))?;

        let mut words: Vec<String> = vec![];
        let mut m: Vec<real> = vec![];
        let mut bytes = Vec::<u8>::new();
        for b in 0..num_words {
            let mut vocab_word = Vec::<u8>::new();
            let count = f.read_until(b' ', &mut vocab_word)?;
            if count == 0 {
                return Err(Error::InvalidVectorFile(format!(
                    "expected {num_words} words, found {b}"
                )));
            }
            if vocab_word.last() == Some(&b' ') {
                vocab_word.pop();
            }
            vocab_word.retain(|c| *c != b'\n');
            words.push(String::from_utf8(vocab_word).map_err(|_| invalid("word is not UTF-8"))?);

            bytes.clear();
            (&mut f).take(row_bytes as u64).read_to_end(&mut bytes)?;
            if bytes.len() != row_bytes {
                return Err(Error::InvalidVectorFile(format!(
                    "vector for word {b} is truncated"
                )));
            }
            m.extend(
                bytes
                    .chunks_exact(std::mem::size_of::<real>())
                    .map(|c| real::from_bits(u32::from_le(bytemuck::pod_read_unaligned(c)))),
            );
        }

        let m = Array2::from_shape_vec((words.len(), size), m)
            .map_err(|_| invalid("vector data does not match the header"))?;
        let mut dictionary = Self::new(words, m);
        dictionary.normalize();
        Ok(dictionary)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let dictionary = Self::load(BufReader::new(File::open(path)?))?;
        info!(
            "loaded {} vectors of size {} from {}",
            dictionary.len(),
            dictionary.size(),
            path.display()
        );
        Ok(dictionary)
    }
}
