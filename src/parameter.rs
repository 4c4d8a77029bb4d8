use crate::error::{Error, Result};
use crate::{real, MAX_SENTENCE_LENGTH};

/// Options for a training run.
///
/// Built with `Default` and the chained `with_*` setters, then checked once
/// with [`validate`](Self::validate) before any weights are allocated.
#[derive(Clone, Debug, PartialEq)]
pub struct WordToVecParameter {
    /// Number of dimensions of each word vector.
    layer_size: usize,

    /// Continuous bag-of-words if true, skip-gram otherwise.
    cbow: bool,

    /// Starting learning rate.
    alpha: real,

    /// Maximum distance between the predicted word and a context word.
    window: usize,

    /// Hierarchical softmax if true, negative sampling otherwise.
    hierarchical_soft_max: bool,

    /// Number of negative examples drawn per target.
    negative_sampling_size: usize,

    /// Number of passes over the corpus.
    number_of_iterations: usize,

    /// Seed for the corpus shuffle.
    seed: u64,
}

impl Default for WordToVecParameter {
    fn default() -> Self {
        WordToVecParameter {
            layer_size: 100,
            cbow: true,
            alpha: 0.025,
            window: 5,
            hierarchical_soft_max: false,
            negative_sampling_size: 5,
            number_of_iterations: 3,
            seed: 1,
        }
    }
}

impl WordToVecParameter {
    pub fn layer_size(&self) -> usize {
        self.layer_size
    }

    pub fn is_cbow(&self) -> bool {
        self.cbow
    }

    pub fn alpha(&self) -> real {
        self.alpha
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn is_hierarchical_soft_max(&self) -> bool {
        self.hierarchical_soft_max
    }

    pub fn negative_sampling_size(&self) -> usize {
        self.negative_sampling_size
    }

    pub fn number_of_iterations(&self) -> usize {
        self.number_of_iterations
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn with_layer_size(mut self, layer_size: usize) -> Self {
        self.layer_size = layer_size;
        self
    }

    pub fn with_cbow(mut self, cbow: bool) -> Self {
        self.cbow = cbow;
        self
    }

    pub fn with_alpha(mut self, alpha: real) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_hierarchical_soft_max(mut self, hierarchical_soft_max: bool) -> Self {
        self.hierarchical_soft_max = hierarchical_soft_max;
        self
    }

    pub fn with_negative_sampling_size(mut self, negative_sampling_size: usize) -> Self {
        self.negative_sampling_size = negative_sampling_size;
        self
    }

    pub fn with_number_of_iterations(mut self, number_of_iterations: usize) -> Self {
        self.number_of_iterations = number_of_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check that the options describe a run that can index its matrices and
    /// draw its windows without going out of range.
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, reason: impl Into<String>) -> Result<()> {
            Err(Error::InvalidParameter {
                name,
                reason: reason.into(),
            })
        }

        if self.layer_size == 0 {
            return invalid("layer_size", "must be at least 1");
        }
        if self.window == 0 {
            return invalid("window", "must be at least 1");
        }
        if self.window > MAX_SENTENCE_LENGTH {
            return invalid(
                "window",
                format!("must be at most {MAX_SENTENCE_LENGTH}, got {}", self.window),
            );
        }
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return invalid("alpha", format!("must be a positive number, got {}", self.alpha));
        }
        if self.number_of_iterations == 0 {
            return invalid("number_of_iterations", "must be at least 1");
        }
        Ok(())
    }
}
