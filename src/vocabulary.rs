use std::cmp::Reverse;

use log::info;

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::MAX_CODE_LENGTH;

/// A word's path from the root of the Huffman tree down to its leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    /// `code[d]` is the branch (0 or 1) taken at internal node `point[d]`.
    code: Vec<u8>,

    /// Internal nodes along the path, root first, as row indexes into the
    /// output-side weight matrix. The root's row is `vocab_size - 2`.
    point: Vec<usize>,
}

impl HuffmanCode {
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn point(&self) -> &[usize] {
        &self.point
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VocabularyWord {
    name: String,
    count: u64,
    /// `None` only in a one-word vocabulary, where the tree has no internal
    /// nodes.
    huffman: Option<HuffmanCode>,
}

impl VocabularyWord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn huffman_code(&self) -> Option<&HuffmanCode> {
        self.huffman.as_ref()
    }

    pub fn code(&self) -> &[u8] {
        self.huffman.as_ref().map_or(&[], HuffmanCode::code)
    }

    pub fn point(&self) -> &[usize] {
        self.huffman.as_ref().map_or(&[], HuffmanCode::point)
    }

    pub fn code_length(&self) -> usize {
        self.code().len()
    }
}

/// The indexed, Huffman-coded vocabulary of a corpus.
///
/// Words are kept in name order, so a word's index is also its row in both
/// weight matrices and lookups are a binary search. The Huffman tree is built
/// over a separate ordering by descending count.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    words: Vec<VocabularyWord>,
    /// Unigram table for negative sampling; `2 * words.len()` word indexes.
    table: Vec<usize>,
}

impl Vocabulary {
    pub fn new<C: Corpus + ?Sized>(corpus: &C) -> Result<Self> {
        Self::from_counts(corpus.distinct_words_with_counts())
    }

    /// Build a vocabulary from `(word, count)` pairs in any order. Repeated
    /// words have their counts summed.
    pub fn from_counts<I>(counts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut words: Vec<VocabularyWord> = counts
            .into_iter()
            .map(|(name, count)| VocabularyWord {
                name,
                count,
                huffman: None,
            })
            .collect();
        words.sort_by(|a, b| a.name.cmp(&b.name));
        words.dedup_by(|later, earlier| {
            if later.name == earlier.name {
                earlier.count += later.count;
                true
            } else {
                false
            }
        });

        if words.is_empty() {
            return Err(Error::EmptyVocabulary);
        }
        if let Some(vw) = words.iter().find(|vw| vw.count == 0) {
            return Err(Error::ZeroCount(vw.name.clone()));
        }

        let table = init_unigram_table(&words);

        let counts: Vec<u64> = words.iter().map(|vw| vw.count).collect();
        for (vw, code) in words.iter_mut().zip(huffman_codes(&counts)) {
            if let Some(code) = &code {
                if code.len() > MAX_CODE_LENGTH {
                    return Err(Error::CodeTooLong {
                        word: vw.name.clone(),
                        length: code.len(),
                    });
                }
            }
            vw.huffman = code;
        }

        info!(
            "vocabulary: {} words, longest Huffman code {} bits",
            words.len(),
            words.iter().map(VocabularyWord::code_length).max().unwrap_or(0)
        );
        Ok(Vocabulary { words, table })
    }

    pub fn size(&self) -> usize {
        self.words.len()
    }

    /// Get the word at `index`. Panics if `index` is out of range.
    pub fn word(&self, index: usize) -> &VocabularyWord {
        &self.words[index]
    }

    pub fn words(&self) -> &[VocabularyWord] {
        &self.words
    }

    /// Find the index of `word`, by binary search over names.
    pub fn position(&self, word: &str) -> Option<usize> {
        self.words
            .binary_search_by(|vw| vw.name.as_str().cmp(word))
            .ok()
    }

    pub fn table_value(&self, index: usize) -> usize {
        self.table[index]
    }

    pub fn table_size(&self) -> usize {
        self.table.len()
    }
}

/// Lay out `2 * words.len()` slots so that word `i` fills a share of them
/// proportional to `count(i)^0.75`. Drawing a uniform slot then samples words
/// with frequent words damped.
fn init_unigram_table(words: &[VocabularyWord]) -> Vec<usize> {
    let power: f64 = 0.75;
    let table_size = 2 * words.len();
    let train_words_pow = words
        .iter()
        .map(|vw| (vw.count as f64).powf(power))
        .sum::<f64>();

    let mut table = Vec::with_capacity(table_size);
    let mut i = 0;
    let mut d1 = (words[i].count as f64).powf(power) / train_words_pow;
    for a in 0..table_size {
        table.push(i);
        if (a as f64 / table_size as f64) > d1 && i + 1 < words.len() {
            i += 1;
            d1 += (words[i].count as f64).powf(power) / train_words_pow;
        }
    }
    table
}

/// Huffman codes for words with the given counts, in the same order as
/// `counts`. The counts may be in any order.
fn huffman_codes(counts: &[u64]) -> Vec<Option<HuffmanCode>> {
    let vocab_size = counts.len();
    if vocab_size < 2 {
        return vec![None; vocab_size];
    }

    // The merge needs leaves by descending count. Stable sort, so equal
    // counts stay in name order.
    let mut order: Vec<usize> = (0..vocab_size).collect();
    order.sort_by_key(|&i| Reverse(counts[i]));
    let sorted: Vec<u64> = order.iter().map(|&i| counts[i]).collect();

    let mut codes = vec![None; vocab_size];
    for (code, &row) in create_binary_tree(&sorted).into_iter().zip(&order) {
        codes[row] = Some(code);
    }
    codes
}

/// Create a binary Huffman tree from word counts, returning the code of each
/// leaf. Frequent words get short codes.
///
/// `counts` must be sorted in descending order and hold at least two entries.
/// The merge walks leaves from the end of the slice (rarest first) and
/// internal nodes in creation order, and never sorts; unsorted input gives a
/// tree that is not a Huffman tree.
pub fn create_binary_tree(counts: &[u64]) -> Vec<HuffmanCode> {
    let vocab_size = counts.len();
    assert!(vocab_size >= 2, "a Huffman tree needs at least two leaves");
    debug_assert!(
        counts.windows(2).all(|w| w[0] >= w[1]),
        "counts must be sorted in descending order"
    );

    let mut count = vec![0u64; vocab_size * 2 + 1];
    let mut binary = vec![0u8; vocab_size * 2 + 1]; // which child a node is of its parent (0 or 1)
    let mut parent_node = vec![0usize; vocab_size * 2 + 1];

    count[..vocab_size].copy_from_slice(counts);
    // Internal nodes not yet created.
    count[vocab_size..].fill(u64::MAX);

    let mut pos1 = vocab_size;
    let mut pos2 = vocab_size;
    // Following algorithm constructs the Huffman tree by adding one node at a time
    for a in 0..(vocab_size - 1) {
        // First, find two smallest nodes 'min1, min2'
        let min1i;
        if pos1 > 0 && count[pos1 - 1] < count[pos2] {
            pos1 -= 1;
            min1i = pos1;
        } else {
            min1i = pos2;
            pos2 += 1;
        }

        let min2i;
        if pos1 > 0 && count[pos1 - 1] < count[pos2] {
            pos1 -= 1;
            min2i = pos1;
        } else {
            min2i = pos2;
            pos2 += 1;
        }

        count[vocab_size + a] = count[min1i] + count[min2i];
        parent_node[min1i] = vocab_size + a;
        parent_node[min2i] = vocab_size + a;
        binary[min2i] = 1;
    }

    // Now assign binary code to each vocabulary word
    let root = vocab_size * 2 - 2;
    (0..vocab_size)
        .map(|a| {
            let mut code: Vec<u8> = vec![];
            let mut point: Vec<usize> = vec![];
            let mut b = a;
            loop {
                if !code.is_empty() {
                    point.push(b - vocab_size);
                }
                code.push(binary[b]);
                b = parent_node[b];
                if b == root {
                    break;
                }
            }
            point.push(root - vocab_size);
            code.reverse();
            point.reverse();
            HuffmanCode { code, point }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use rand::Rng;

    use super::*;

    fn vocab(counts: &[u64]) -> Vocabulary {
        Vocabulary::from_counts(
            counts
                .iter()
                .enumerate()
                .map(|(i, &c)| (format!("w{i:03}"), c)),
        )
        .unwrap()
    }

    /// Weighted path length of an optimal prefix code, by the textbook
    /// heap-based Huffman merge.
    fn optimal_weighted_length(counts: &[u64]) -> u64 {
        let mut heap: BinaryHeap<Reverse<u64>> = counts.iter().map(|&c| Reverse(c)).collect();
        let mut total = 0;
        while heap.len() > 1 {
            let Reverse(a) = heap.pop().unwrap();
            let Reverse(b) = heap.pop().unwrap();
            total += a + b;
            heap.push(Reverse(a + b));
        }
        total
    }

    fn weighted_length(v: &Vocabulary) -> u64 {
        v.words()
            .iter()
            .map(|vw| vw.count() * vw.code_length() as u64)
            .sum()
    }

    fn kraft_sum(v: &Vocabulary) -> f64 {
        v.words()
            .iter()
            .map(|vw| 0.5f64.powi(vw.code_length() as i32))
            .sum()
    }

    fn check_well_formed(v: &Vocabulary) {
        let n = v.size();
        for vw in v.words() {
            assert!(vw.code_length() >= 1 && vw.code_length() <= MAX_CODE_LENGTH);
            assert!(vw.code().iter().all(|&bit| bit <= 1));
            assert_eq!(vw.point().len(), vw.code_length());
            assert_eq!(vw.point()[0], n - 2);
            assert!(vw.point().iter().all(|&p| p < n - 1));
        }
        // prefix-free, and words that share a code prefix share the nodes on it
        for a in v.words() {
            for b in v.words() {
                if a.name() == b.name() {
                    continue;
                }
                assert!(!b.code().starts_with(a.code()), "{a:?} is a prefix of {b:?}");
                let shared = a
                    .code()
                    .iter()
                    .zip(b.code())
                    .take_while(|(x, y)| x == y)
                    .count();
                assert_eq!(a.point()[..=shared], b.point()[..=shared]);
            }
        }
    }

    #[test]
    fn small_tree() {
        let v = vocab(&[1, 1, 2, 3, 5]);
        check_well_formed(&v);
        let lengths: Vec<usize> = v.words().iter().map(VocabularyWord::code_length).collect();
        assert_eq!(lengths, [4, 4, 3, 2, 1]);
        assert_eq!(weighted_length(&v), 25);
        assert_eq!(weighted_length(&v), optimal_weighted_length(&[1, 1, 2, 3, 5]));
        assert!((kraft_sum(&v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tree_from_sorted_counts() {
        let codes = create_binary_tree(&[5, 3, 2, 1, 1]);
        assert_eq!(codes[0].code(), [0]);
        assert_eq!(codes[0].point(), [3]);
        assert_eq!(codes[1].code(), [1, 0]);
        assert_eq!(codes[1].point(), [3, 2]);
        assert_eq!(codes[2].code(), [1, 1, 1]);
        assert_eq!(codes[2].point(), [3, 2, 1]);
        assert_eq!(codes[3].code(), [1, 1, 0, 1]);
        assert_eq!(codes[3].point(), [3, 2, 1, 0]);
        assert_eq!(codes[4].code(), [1, 1, 0, 0]);
        assert_eq!(codes[4].point(), [3, 2, 1, 0]);
    }

    #[test]
    fn optimal_for_any_input_order() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let n = rng.gen_range(2..200);
            let counts: Vec<u64> = (0..n).map(|_| rng.gen_range(1..10_000)).collect();
            let v = vocab(&counts);
            check_well_formed(&v);
            assert_eq!(weighted_length(&v), optimal_weighted_length(&counts));
            assert!((kraft_sum(&v) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn lookup_by_name() {
        let v = Vocabulary::from_counts(vec![
            ("pear".to_string(), 3),
            ("apple".to_string(), 10),
            ("fig".to_string(), 1),
        ])
        .unwrap();
        let names: Vec<&str> = v.words().iter().map(VocabularyWord::name).collect();
        assert_eq!(names, ["apple", "fig", "pear"]);
        for (i, name) in names.iter().enumerate() {
            assert_eq!(v.position(name), Some(i));
            assert_eq!(v.word(i).name(), *name);
        }
        assert_eq!(v.position("banana"), None);
        assert_eq!(v.word(0).count(), 10);
        // most frequent word gets the shortest code even though it's not last
        assert_eq!(v.word(0).code_length(), 1);
    }

    #[test]
    fn duplicates_are_merged() {
        let v = Vocabulary::from_counts(vec![
            ("a".to_string(), 2),
            ("b".to_string(), 1),
            ("a".to_string(), 3),
        ])
        .unwrap();
        assert_eq!(v.size(), 2);
        assert_eq!(v.word(0).count(), 5);
    }

    #[test]
    fn single_word() {
        let v = vocab(&[7]);
        assert_eq!(v.size(), 1);
        assert!(v.word(0).huffman_code().is_none());
        assert_eq!(v.word(0).code_length(), 0);
        assert_eq!(v.table_size(), 2);
        assert_eq!(v.table_value(0), 0);
        assert_eq!(v.table_value(1), 0);
    }

    #[test]
    fn errors() {
        assert!(matches!(
            Vocabulary::from_counts(Vec::new()),
            Err(Error::EmptyVocabulary)
        ));
        assert!(matches!(
            Vocabulary::from_counts(vec![("a".to_string(), 1), ("b".to_string(), 0)]),
            Err(Error::ZeroCount(w)) if w == "b"
        ));

        // Fibonacci counts give a maximally unbalanced tree.
        let mut fib = vec![1u64, 1];
        while fib.len() < 45 {
            fib.push(fib[fib.len() - 1] + fib[fib.len() - 2]);
        }
        assert!(matches!(
            Vocabulary::from_counts(fib.iter().enumerate().map(|(i, &c)| (format!("w{i:03}"), c))),
            Err(Error::CodeTooLong { length, .. }) if length > MAX_CODE_LENGTH
        ));
    }

    #[test]
    fn unigram_table_distribution() {
        let counts: Vec<u64> = (50..150).collect();
        let v = vocab(&counts);
        let n = v.size();
        assert_eq!(v.table_size(), 2 * n);
        assert!((0..v.table_size()).all(|i| v.table_value(i) < n));
        assert!((1..v.table_size()).all(|i| v.table_value(i - 1) <= v.table_value(i)));

        let weights: Vec<f64> = counts.iter().map(|&c| (c as f64).powf(0.75)).collect();
        let total: f64 = weights.iter().sum();
        let mut target = 0.0;
        let mut slots = 0;
        for (i, w) in weights.iter().enumerate() {
            target += w / total;
            slots += (0..v.table_size()).filter(|&s| v.table_value(s) == i).count();
            let empirical = slots as f64 / v.table_size() as f64;
            assert!(
                (empirical - target).abs() < 0.02,
                "word {i}: table share {empirical}, expected {target}"
            );
        }
    }

    #[test]
    fn unigram_table_damps_frequent_words() {
        let counts: Vec<u64> = (0..500).map(|i| if i == 0 { 100_000 } else { 100 }).collect();
        let v = vocab(&counts);
        let share = (0..v.table_size()).filter(|&s| v.table_value(s) == 0).count() as f64
            / v.table_size() as f64;
        let raw = 100_000.0 / (100_000.0 + 499.0 * 100.0);
        assert!(share < raw, "frequent word share {share} should be below raw frequency {raw}");
    }
}
