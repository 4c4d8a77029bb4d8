//! End-to-end training runs through the public API.

use ndarray::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use wordtovec::*;

/// Sentences that each draw all their words from one of two disjoint topics.
fn two_topic_corpus(sentences: usize) -> TextCorpus {
    let topics = [
        ["apple", "pear", "plum", "grape", "melon"],
        ["red", "green", "blue", "cyan", "mauve"],
    ];
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let text: Vec<Sentence> = (0..sentences)
        .map(|i| {
            let topic = &topics[i % 2];
            (0..10)
                .map(|_| *topic.choose(&mut rng).unwrap())
                .collect::<Sentence>()
        })
        .collect();
    TextCorpus::new(text)
}

fn cosine(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.dot(&b) / (a.dot(&a).sqrt() * b.dot(&b).sqrt())
}

fn topic_separation(dictionary: &VectorizedDictionary) -> (f32, f32) {
    let fruit = ["apple", "pear", "plum", "grape", "melon"];
    let mut within = vec![];
    let mut across = vec![];
    for (i, (a, va)) in dictionary.iter().enumerate() {
        for (b, vb) in dictionary.iter().skip(i + 1) {
            let sim = cosine(va, vb);
            if fruit.contains(&a) == fruit.contains(&b) {
                within.push(sim);
            } else {
                across.push(sim);
            }
        }
    }
    let mean = |v: &[f32]| v.iter().sum::<f32>() / v.len() as f32;
    (mean(&within), mean(&across))
}

fn variants() -> Vec<WordToVecParameter> {
    let mut all = vec![];
    for cbow in [true, false] {
        for hs in [true, false] {
            all.push(
                WordToVecParameter::default()
                    .with_layer_size(12)
                    .with_window(3)
                    .with_cbow(cbow)
                    .with_hierarchical_soft_max(hs)
                    .with_number_of_iterations(2),
            );
        }
    }
    all
}

#[test]
fn every_variant_produces_one_vector_per_word() {
    for parameter in variants() {
        let corpus = two_topic_corpus(200);
        let network = NeuralNetwork::new(corpus, parameter.clone()).unwrap();
        let names: Vec<String> = network
            .vocabulary()
            .words()
            .iter()
            .map(|vw| vw.name().to_string())
            .collect();

        let dictionary = network.train().unwrap();
        assert_eq!(dictionary.len(), 10);
        assert_eq!(dictionary.size(), 12);
        for (i, (word, vector)) in dictionary.iter().enumerate() {
            assert_eq!(word, names[i]);
            assert_eq!(vector.len(), 12);
            assert!(
                vector.iter().all(|x| x.is_finite()),
                "non-finite vector for {word} with {parameter:?}"
            );
        }
    }
}

#[test]
fn related_words_end_up_closer() {
    for cbow in [true, false] {
        let parameter = WordToVecParameter::default()
            .with_layer_size(10)
            .with_window(3)
            .with_cbow(cbow)
            .with_number_of_iterations(5);
        let dictionary = NeuralNetwork::new(two_topic_corpus(2000), parameter)
            .unwrap()
            .train()
            .unwrap();

        let (within, across) = topic_separation(&dictionary);
        assert!(
            within > across + 0.1,
            "cbow={cbow}: within-topic {within}, across-topic {across}"
        );

        let best = dictionary.most_similar(&["apple"], 4).unwrap();
        let fruit = ["pear", "plum", "grape", "melon"];
        let hits = best.iter().filter(|(w, _)| fruit.contains(w)).count();
        assert!(hits >= 3, "cbow={cbow}: neighbors of apple were {best:?}");
    }
}

#[test]
fn single_word_vocabulary() {
    for parameter in variants() {
        let corpus = TextCorpus::from_reader("echo echo echo\necho\n".as_bytes(), 1).unwrap();
        let dictionary = NeuralNetwork::new(corpus, parameter.with_layer_size(4))
            .unwrap()
            .train()
            .unwrap();
        assert_eq!(dictionary.len(), 1);
        assert!(dictionary.get("echo").unwrap().iter().all(|x| x.is_finite()));
    }
}

#[test]
fn corpus_from_file() {
    let path = std::env::temp_dir().join(format!("wordtovec-corpus-{}.txt", std::process::id()));
    std::fs::write(&path, "the quick brown fox\njumps over the lazy dog\nthe end\n").unwrap();
    let corpus = TextCorpus::from_file(&path, 2).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(corpus.sentence_count(), 3);
    assert_eq!(corpus.number_of_words(), 3);
    assert_eq!(corpus.distinct_words_with_counts(), vec![("the".to_string(), 3)]);

    let missing = std::env::temp_dir().join("wordtovec-no-such-file.txt");
    assert!(matches!(
        TextCorpus::from_file(&missing, 1),
        Err(Error::Io(_))
    ));
}

#[test]
fn saved_vectors_load_back() {
    let parameter = WordToVecParameter::default()
        .with_layer_size(8)
        .with_number_of_iterations(1);
    let dictionary = NeuralNetwork::new(two_topic_corpus(100), parameter)
        .unwrap()
        .train()
        .unwrap();

    let mut binary = vec![];
    dictionary.write_binary(&mut binary).unwrap();
    let loaded = VectorizedDictionary::load(&binary[..]).unwrap();

    let mut expected = dictionary.clone();
    expected.normalize();
    assert_eq!(loaded.len(), expected.len());
    for ((w1, v1), (w2, v2)) in loaded.iter().zip(expected.iter()) {
        assert_eq!(w1, w2);
        assert!((&v1 - &v2).iter().all(|d| d.abs() < 1e-6));
    }

    let mut text = vec![];
    dictionary.write_text(&mut text).unwrap();
    let text = String::from_utf8(text).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("10 8"));
    let first: Vec<&str> = lines.next().unwrap().split_whitespace().collect();
    assert_eq!(first[0], dictionary.word(0));
    let parsed: Vec<f32> = first[1..].iter().map(|s| s.parse().unwrap()).collect();
    assert_eq!(parsed, dictionary.vector(0).to_vec());
}

#[test]
fn shuffle_seed_controls_sentence_order_only() {
    let parameter = WordToVecParameter::default()
        .with_layer_size(4)
        .with_number_of_iterations(1);
    let a = NeuralNetwork::new(two_topic_corpus(50), parameter.clone().with_seed(1)).unwrap();
    let b = NeuralNetwork::new(two_topic_corpus(50), parameter.with_seed(2)).unwrap();
    // The vocabulary depends only on the text.
    let names = |n: &NeuralNetwork<TextCorpus>| -> Vec<(String, u64)> {
        n.vocabulary()
            .words()
            .iter()
            .map(|vw| (vw.name().to_string(), vw.count()))
            .collect()
    };
    assert_eq!(names(&a), names(&b));
    assert_eq!(a.train().unwrap().len(), b.train().unwrap().len());
}
