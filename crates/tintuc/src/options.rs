// ABOUTME: Configuration for tintuc: the ExtractionPolicy variant, Options, and ExtractorBuilder.
// ABOUTME: ExtractorBuilder resolves word and paragraph limits into one policy at build time.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::ExtractError;
use crate::extractor::Extractor;
use crate::sites::SiteRegistry;

/// Firefox on Windows; several sites block or trim content for default client identities.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:139.0) Gecko/20100101 Firefox/139.0";

pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Vietnamese first, then English.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "vi-VN,vi;q=0.9,en-US;q=0.8,en;q=0.7";

/// How much of the article body to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionPolicy {
    /// Every paragraph.
    #[default]
    All,
    /// The first `n` words of the body.
    WordLimit(usize),
    /// `count` paragraphs: the first ones, or a contiguous window at a random offset.
    ParagraphCount { count: usize, random: bool },
}

impl ExtractionPolicy {
    /// Resolves user-facing limits into a policy.
    ///
    /// A word limit wins over a paragraph count, and randomization only
    /// applies to paragraph counts: with a word limit set, `paragraphs` and
    /// `take_random` are discarded. Zero limits count as unset.
    pub fn from_limits(
        word_limit: Option<usize>,
        paragraphs: Option<usize>,
        take_random: bool,
    ) -> Self {
        match (word_limit.filter(|&n| n > 0), paragraphs.filter(|&n| n > 0)) {
            (Some(words), _) => ExtractionPolicy::WordLimit(words),
            (None, Some(count)) => ExtractionPolicy::ParagraphCount {
                count,
                random: take_random,
            },
            (None, None) => ExtractionPolicy::All,
        }
    }
}

impl fmt::Display for ExtractionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionPolicy::All => write!(f, "all"),
            ExtractionPolicy::WordLimit(n) => write!(f, "first {} words", n),
            ExtractionPolicy::ParagraphCount { count, random: false } => {
                write!(f, "first {} paragraphs", count)
            }
            ExtractionPolicy::ParagraphCount { count, random: true } => {
                write!(f, "{} contiguous paragraphs at a random offset", count)
            }
        }
    }
}

/// Configuration options for the extractor and its fetch session.
#[derive(Debug, Clone)]
pub struct Options {
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
    pub headers: HashMap<String, String>,
    /// Pause before re-requesting a page after answering a cookie challenge.
    pub challenge_delay: Duration,
    pub policy: ExtractionPolicy,
    pub registry: Option<SiteRegistry>,
    /// Seed for the paragraph window RNG; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            headers: HashMap::new(),
            challenge_delay: Duration::from_millis(500),
            policy: ExtractionPolicy::All,
            registry: None,
            seed: None,
        }
    }
}

/// Builder for constructing Extractor instances with custom configuration.
#[derive(Debug, Clone, Default)]
pub struct ExtractorBuilder {
    opts: Options,
    word_limit: Option<usize>,
    paragraphs: Option<usize>,
    take_random: bool,
    policy: Option<ExtractionPolicy>,
}

impl ExtractorBuilder {
    /// Create a new ExtractorBuilder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Set the Accept-Language header.
    pub fn accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.opts.accept_language = accept_language.into();
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Set the pause between answering a cookie challenge and retrying.
    pub fn challenge_delay(mut self, delay: Duration) -> Self {
        self.opts.challenge_delay = delay;
        self
    }

    /// Keep only the first `n` words of the body.
    pub fn word_limit(mut self, n: usize) -> Self {
        self.word_limit = Some(n);
        self
    }

    /// Keep `n` paragraphs of the body.
    pub fn paragraphs(mut self, n: usize) -> Self {
        self.paragraphs = Some(n);
        self
    }

    /// Pick the kept paragraphs as a window at a random offset.
    pub fn take_random(mut self, take_random: bool) -> Self {
        self.take_random = take_random;
        self
    }

    /// Set the policy directly, ignoring word_limit/paragraphs/take_random.
    pub fn policy(mut self, policy: ExtractionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Use a custom site registry instead of the builtin table.
    pub fn registry(mut self, registry: SiteRegistry) -> Self {
        self.opts.registry = Some(registry);
        self
    }

    /// Seed the RNG used for random paragraph windows.
    pub fn seed(mut self, seed: u64) -> Self {
        self.opts.seed = Some(seed);
        self
    }

    /// Returns the options this builder would build with, policy resolved.
    pub fn options(&self) -> Options {
        let mut opts = self.opts.clone();
        opts.policy = self.policy.unwrap_or_else(|| {
            ExtractionPolicy::from_limits(self.word_limit, self.paragraphs, self.take_random)
        });
        opts
    }

    /// Build the Extractor with the configured options.
    pub fn build(self) -> Result<Extractor, ExtractError> {
        Extractor::new(self.options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_limit_overrides_everything() {
        assert_eq!(
            ExtractionPolicy::from_limits(Some(100), Some(3), true),
            ExtractionPolicy::WordLimit(100)
        );
        assert_eq!(
            ExtractionPolicy::from_limits(Some(100), None, true),
            ExtractionPolicy::WordLimit(100)
        );
    }

    #[test]
    fn paragraphs_carry_random_flag() {
        assert_eq!(
            ExtractionPolicy::from_limits(None, Some(3), true),
            ExtractionPolicy::ParagraphCount {
                count: 3,
                random: true
            }
        );
        assert_eq!(
            ExtractionPolicy::from_limits(None, Some(3), false),
            ExtractionPolicy::ParagraphCount {
                count: 3,
                random: false
            }
        );
    }

    #[test]
    fn no_limits_means_all() {
        assert_eq!(ExtractionPolicy::from_limits(None, None, false), ExtractionPolicy::All);
        // randomization without a paragraph count has nothing to act on
        assert_eq!(ExtractionPolicy::from_limits(None, None, true), ExtractionPolicy::All);
    }

    #[test]
    fn zero_limits_are_unset() {
        assert_eq!(
            ExtractionPolicy::from_limits(Some(0), Some(2), false),
            ExtractionPolicy::ParagraphCount {
                count: 2,
                random: false
            }
        );
        assert_eq!(ExtractionPolicy::from_limits(None, Some(0), true), ExtractionPolicy::All);
    }

    #[test]
    fn builder_resolves_policy() {
        let opts = ExtractorBuilder::new()
            .word_limit(150)
            .paragraphs(3)
            .take_random(true)
            .options();
        assert_eq!(opts.policy, ExtractionPolicy::WordLimit(150));

        let opts = ExtractorBuilder::new().paragraphs(2).take_random(true).options();
        assert_eq!(
            opts.policy,
            ExtractionPolicy::ParagraphCount {
                count: 2,
                random: true
            }
        );
    }

    #[test]
    fn explicit_policy_wins() {
        let opts = ExtractorBuilder::new()
            .word_limit(10)
            .policy(ExtractionPolicy::All)
            .options();
        assert_eq!(opts.policy, ExtractionPolicy::All);
    }

    #[test]
    fn default_options() {
        let opts = Options::default();
        assert_eq!(opts.timeout, Duration::from_secs(30));
        assert_eq!(opts.challenge_delay, Duration::from_millis(500));
        assert!(opts.user_agent.contains("Firefox"));
        assert!(opts.accept_language.starts_with("vi-VN"));
    }

    #[test]
    fn policy_display() {
        assert_eq!(ExtractionPolicy::WordLimit(5).to_string(), "first 5 words");
        assert_eq!(
            ExtractionPolicy::ParagraphCount {
                count: 2,
                random: true
            }
            .to_string(),
            "2 contiguous paragraphs at a random offset"
        );
    }
}
