//! Question supply: cache first, then concurrent generation, then the bank.
//!
//! For a fixed difficulty the supply takes what it can from the cache, fetches
//! the remainder with at most `parallelism` requests in flight, and falls back
//! to one bundled question for every fetch that fails. A "Random" difficulty
//! request is split evenly across Easy/Medium/Hard and interleaved, with or
//! without a provider.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::Rng;
use tokio::sync::{Mutex, Semaphore};
use tracing::instrument;
use uuid::Uuid;

use crate::bank::QuestionBank;
use crate::cache::{cache_key, QuestionCache};
use crate::error::{GenerationError, ProviderError};
use crate::model::{is_random_category, Difficulty, DifficultyChoice, QuizQuestion, RawQuestion};
use crate::traits::{extract_json_payload, GenerateRequest, LlmProvider};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Anything that can hand a session its questions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn questions(
        &self,
        count: usize,
        category: &str,
        difficulty: DifficultyChoice,
    ) -> Result<Vec<QuizQuestion>>;
}

/// Progress callbacks for [`QuestionSupply::stock_up`].
pub trait StockReporter: Send + Sync {
    /// Fired once per finished generation, successful or not.
    fn on_generated(&self, difficulty: Difficulty, completed: usize, total: usize);
    fn on_generation_error(&self, difficulty: Difficulty, error: &str);
    fn on_stock_complete(&self, added: usize, failed: usize, elapsed: Duration);
}

/// A reporter that discards all progress.
pub struct NoopStockReporter;

impl StockReporter for NoopStockReporter {
    fn on_generated(&self, _: Difficulty, _: usize, _: usize) {}
    fn on_generation_error(&self, _: Difficulty, _: &str) {}
    fn on_stock_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// Tuning for question generation.
#[derive(Debug, Clone)]
pub struct SupplyConfig {
    /// Maximum generation requests in flight.
    pub parallelism: usize,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Retries on transient provider errors (not on bad content).
    pub max_retries: u32,
    /// Initial delay between retries, doubled each time.
    pub retry_delay: Duration,
    /// Extra questions requested whenever a fetch is needed; they go to the cache.
    pub restock_margin: usize,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            temperature: 1.0,
            max_tokens: 1024,
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            restock_margin: 0,
        }
    }
}

pub struct QuestionSupply {
    provider: Option<Arc<dyn LlmProvider>>,
    bank: Arc<QuestionBank>,
    cache: Mutex<QuestionCache>,
    permits: Arc<Semaphore>,
    config: SupplyConfig,
}

impl QuestionSupply {
    /// Without a provider every request is served from the bank.
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        bank: Arc<QuestionBank>,
        cache: QuestionCache,
        config: SupplyConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.parallelism.max(1)));
        Self {
            provider,
            bank,
            cache: Mutex::new(cache),
            permits,
            config,
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Number of cached questions for one key.
    pub async fn cached(&self, category: &str, difficulty: Difficulty) -> usize {
        self.cache.lock().await.len(&cache_key(category, difficulty))
    }

    /// `(key, queued count)` for every non-empty cache key.
    pub async fn cache_summary(&self) -> Vec<(String, usize)> {
        self.cache.lock().await.summary()
    }

    /// Exactly `count` questions for `category` / `difficulty`.
    #[instrument(skip(self))]
    pub async fn questions(
        &self,
        count: usize,
        category: &str,
        difficulty: DifficultyChoice,
    ) -> Vec<QuizQuestion> {
        if count == 0 {
            return Vec::new();
        }
        match difficulty {
            DifficultyChoice::Level(_) if self.provider.is_none() => {
                self.bank.sample(count, category, difficulty)
            }
            DifficultyChoice::Level(d) => self.fetch_and_cache(count, category, d).await,
            DifficultyChoice::Random => self.random_mix(count, category).await,
        }
    }

    /// Fill the cache for `category` / `difficulty` up to `target` queued
    /// questions. Returns how many were added.
    pub async fn stock_up(
        &self,
        category: &str,
        difficulty: DifficultyChoice,
        target: usize,
        reporter: &dyn StockReporter,
    ) -> Result<usize> {
        let Some(provider) = &self.provider else {
            anyhow::bail!("no generation provider configured; nothing to stock");
        };
        let levels: Vec<Difficulty> = match difficulty {
            DifficultyChoice::Level(d) => vec![d],
            DifficultyChoice::Random => Difficulty::ALL.to_vec(),
        };

        let mut needs = Vec::with_capacity(levels.len());
        {
            let cache = self.cache.lock().await;
            for level in &levels {
                let have = cache.len(&cache_key(category, *level));
                needs.push((*level, target.saturating_sub(have)));
            }
        }

        let start = Instant::now();
        let total: usize = needs.iter().map(|(_, need)| need).sum();
        let mut futures = FuturesUnordered::new();
        for &(level, need) in &needs {
            for _ in 0..need {
                let generation = self.generation(provider, category, level);
                futures.push(async move { (level, generation.await) });
            }
        }

        let mut generated: HashMap<Difficulty, Vec<QuizQuestion>> = HashMap::new();
        let mut completed = 0;
        let mut failed = 0;
        while let Some((level, result)) = futures.next().await {
            completed += 1;
            match result {
                Ok(q) => generated.entry(level).or_default().push(q),
                Err(e) => {
                    failed += 1;
                    tracing::warn!("stocking {category}/{level} failed: {e:#}");
                    reporter.on_generation_error(level, &format!("{e:#}"));
                }
            }
            reporter.on_generated(level, completed, total);
        }

        let added = completed - failed;
        let mut cache = self.cache.lock().await;
        for (level, questions) in generated {
            cache.extend(&cache_key(category, level), questions);
        }
        cache.save()?;
        tracing::info!("stocked {added} questions for {category}/{difficulty}");
        reporter.on_stock_complete(added, failed, start.elapsed());
        Ok(added)
    }

    async fn fetch_and_cache(
        &self,
        count: usize,
        category: &str,
        difficulty: Difficulty,
    ) -> Vec<QuizQuestion> {
        if count == 0 {
            return Vec::new();
        }
        if self.provider.is_none() {
            return self.bank.sample_level(count, category, difficulty);
        }
        let key = cache_key(category, difficulty);
        let mut served = self.cache.lock().await.take(&key, count);
        if !served.is_empty() {
            tracing::debug!("served {} cached questions for {key}", served.len());
        }

        let remaining = count - served.len();
        let requested = if remaining > 0 {
            remaining + self.config.restock_margin
        } else {
            0
        };

        let mut surplus = Vec::new();
        for result in self.generate_batch(requested, category, difficulty).await {
            match result {
                Ok(q) if served.len() < count => served.push(q),
                Ok(q) => surplus.push(q),
                Err(e) => tracing::warn!("generation for {key} failed, using bundled question: {e:#}"),
            }
        }
        while served.len() < count {
            served.push(self.bank.pick_level(category, difficulty));
        }

        let mut cache = self.cache.lock().await;
        cache.extend(&key, surplus);
        if let Err(e) = cache.save() {
            tracing::warn!("failed to persist question cache: {e:#}");
        }
        served
    }

    async fn random_mix(&self, count: usize, category: &str) -> Vec<QuizQuestion> {
        let split = split_evenly(count, &mut rand::thread_rng());
        let batches = futures::future::join_all(
            Difficulty::ALL
                .iter()
                .zip(split)
                .map(|(level, n)| self.fetch_and_cache(n, category, *level)),
        )
        .await;
        interleave(batches)
    }

    /// Run `n` generations with bounded parallelism. Order is completion order.
    async fn generate_batch(
        &self,
        n: usize,
        category: &str,
        difficulty: Difficulty,
    ) -> Vec<Result<QuizQuestion>> {
        let Some(provider) = &self.provider else {
            return Vec::new();
        };

        let mut futures: FuturesUnordered<_> = (0..n)
            .map(|_| self.generation(provider, category, difficulty))
            .collect();

        let mut results = Vec::with_capacity(n);
        while let Some(result) = futures.next().await {
            results.push(result);
        }
        results
    }

    /// One generation that waits for a parallelism permit first.
    fn generation(
        &self,
        provider: &Arc<dyn LlmProvider>,
        category: &str,
        difficulty: Difficulty,
    ) -> impl Future<Output = Result<QuizQuestion>> + Send + 'static {
        let provider = Arc::clone(provider);
        let permits = Arc::clone(&self.permits);
        let config = self.config.clone();
        let category = category.to_string();

        async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
            generate_question(provider.as_ref(), &config, &category, difficulty).await
        }
    }
}

#[async_trait]
impl QuestionSource for QuestionSupply {
    async fn questions(
        &self,
        count: usize,
        category: &str,
        difficulty: DifficultyChoice,
    ) -> Result<Vec<QuizQuestion>> {
        Ok(QuestionSupply::questions(self, count, category, difficulty).await)
    }
}

/// Ask the provider for one question, retrying transient failures.
async fn generate_question(
    provider: &dyn LlmProvider,
    config: &SupplyConfig,
    category: &str,
    difficulty: Difficulty,
) -> Result<QuizQuestion> {
    let request = GenerateRequest {
        prompt: question_prompt(category, difficulty),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: Some(0.92),
        top_k: Some(40),
        json_output: true,
    };

    let start = Instant::now();
    let mut last_error = None;
    let mut retry_delay = config.retry_delay;
    for retry in 0..=config.max_retries {
        if retry > 0 {
            tokio::time::sleep(retry_delay).await;
            retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
        }
        match provider.generate(&request).await {
            Ok(response) => {
                let question = parse_generated_question(&response.content, category, difficulty)?;
                tracing::debug!(
                    "generated {category}/{difficulty} question in {}ms",
                    start.elapsed().as_millis()
                );
                return Ok(question);
            }
            Err(e) => {
                if let Some(provider_error) = e.downcast_ref::<ProviderError>() {
                    if provider_error.is_permanent() {
                        return Err(e);
                    }
                    if let Some(ms) = provider_error.retry_after_ms() {
                        retry_delay = Duration::from_millis(ms);
                    }
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("unknown error")))
}

/// Decode a generated question and stamp it with the requested category and
/// difficulty and a fresh id.
pub fn parse_generated_question(
    content: &str,
    category: &str,
    difficulty: Difficulty,
) -> Result<QuizQuestion, GenerationError> {
    let payload = extract_json_payload(content);
    if payload.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    let raw: RawQuestion = serde_json::from_str(payload)?;
    let mut question = QuizQuestion::try_from(raw)?
        .with_category(category)
        .with_difficulty(difficulty);
    question.id = Uuid::new_v4();
    Ok(question)
}

pub fn question_prompt(category: &str, difficulty: Difficulty) -> String {
    let topic = if is_random_category(category) {
        "mixed topics"
    } else {
        category
    };
    format!(
        "Generate a unique, {difficulty}-difficulty general knowledge trivia question about {topic}. \
         Provide the question, 4 multiple-choice options, and the correct answer in English; the answer \
         must be exactly one of the options. Also provide a Japanese translation of the question. \
         Include a brief, simple explanation in English for the correct answer (suitable for English \
         learners), and its Japanese translation. Finally, provide a list of 2-3 important vocabulary \
         words from the question or explanation, with their Japanese meanings.\n\
         Respond ONLY with JSON of this shape: {{\"question\": string, \"questionJapanese\": string, \
         \"options\": [string, string, string, string], \"answer\": string, \"explanation\": string, \
         \"explanationJapanese\": string, \"vocabulary\": [{{\"word\": string, \"meaning\": string}}]}}"
    )
}

/// Per-level counts for `count` questions: each level gets `count / 3` and
/// the remainder goes to distinct randomly chosen levels.
pub fn split_evenly<R: Rng + ?Sized>(count: usize, rng: &mut R) -> [usize; 3] {
    let mut split = [count / 3; 3];
    for i in rand::seq::index::sample(rng, 3, count % 3) {
        split[i] += 1;
    }
    split
}

/// Round-robin merge: first of each batch, then second of each, and so on.
pub fn interleave<T>(batches: Vec<Vec<T>>) -> Vec<T> {
    let total = batches.iter().map(Vec::len).sum();
    let mut iters: Vec<_> = batches.into_iter().map(Vec::into_iter).collect();
    let mut merged = Vec::with_capacity(total);
    while merged.len() < total {
        for it in iters.iter_mut() {
            if let Some(item) = it.next() {
                merged.push(item);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{GenerateResponse, TokenUsage};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Returns a distinct valid question per call, or fails for prompts
    /// containing `fail_on`.
    struct CountingProvider {
        calls: AtomicU32,
        fail_on: Option<&'static str>,
        error: fn() -> ProviderError,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_on: None,
                error: || ProviderError::NetworkError("connection reset".into()),
            }
        }

        fn failing_on(fail_on: &'static str, error: fn() -> ProviderError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_on: Some(fail_on),
                error,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.is_some_and(|f| request.prompt.contains(f)) {
                return Err((self.error)().into());
            }
            let content = format!(
                "```json\n{{\"question\": \"Generated {n}\", \"questionJapanese\": \"生成 {n}\", \
                 \"options\": [\"a\", \"b\", \"c\", \"d\"], \"answer\": \"c\", \
                 \"explanation\": \"because\", \"explanationJapanese\": \"なぜなら\", \
                 \"vocabulary\": [{{\"word\": \"because\", \"meaning\": \"なぜなら\"}}]}}\n```"
            );
            Ok(GenerateResponse {
                content,
                model: "counting-model".into(),
                token_usage: TokenUsage::default(),
                latency_ms: 0,
            })
        }
    }

    fn bank() -> Arc<QuestionBank> {
        let q = |text: &str, difficulty| {
            QuizQuestion::new(text, vec!["x".into(), "y".into()], "x")
                .unwrap()
                .with_category("Science")
                .with_difficulty(difficulty)
        };
        Arc::new(QuestionBank::new(vec![
            q("bundled easy", Difficulty::Easy),
            q("bundled medium", Difficulty::Medium),
            q("bundled hard", Difficulty::Hard),
        ]))
    }

    fn question_at(text: &str, difficulty: Difficulty) -> QuizQuestion {
        QuizQuestion::new(text, vec!["x".into(), "y".into()], "x")
            .unwrap()
            .with_category("Science")
            .with_difficulty(difficulty)
    }

    fn level_counts(qs: &[QuizQuestion]) -> Vec<usize> {
        Difficulty::ALL
            .iter()
            .map(|d| qs.iter().filter(|q| q.difficulty == *d).count())
            .collect()
    }

    fn assert_even(counts: &[usize], context: &str) {
        let min = *counts.iter().min().unwrap();
        let max = *counts.iter().max().unwrap();
        assert!(max - min <= 1, "{context}: {counts:?}");
    }

    /// Records every progress callback.
    #[derive(Default)]
    struct RecordingReporter {
        progress: StdMutex<Vec<(usize, usize)>>,
        errors: AtomicU32,
        finished: StdMutex<Option<(usize, usize)>>,
    }

    impl StockReporter for RecordingReporter {
        fn on_generated(&self, _: Difficulty, completed: usize, total: usize) {
            self.progress.lock().unwrap().push((completed, total));
        }

        fn on_generation_error(&self, _: Difficulty, _: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stock_complete(&self, added: usize, failed: usize, _: Duration) {
            *self.finished.lock().unwrap() = Some((added, failed));
        }
    }

    fn fast_config() -> SupplyConfig {
        SupplyConfig {
            retry_delay: Duration::from_millis(1),
            ..SupplyConfig::default()
        }
    }

    fn supply_with(provider: Arc<dyn LlmProvider>, cache: QuestionCache) -> QuestionSupply {
        QuestionSupply::new(Some(provider), bank(), cache, fast_config())
    }

    fn generated(text: &str) -> QuizQuestion {
        QuizQuestion::new(text, vec!["a".into(), "b".into()], "a")
            .unwrap()
            .with_category("Science")
            .with_difficulty(Difficulty::Easy)
    }

    #[test]
    fn split_is_within_one_of_even() {
        let mut rng = rand::thread_rng();
        for count in 0..40 {
            let split = split_evenly(count, &mut rng);
            assert_eq!(split.iter().sum::<usize>(), count);
            let min = *split.iter().min().unwrap();
            let max = *split.iter().max().unwrap();
            assert!(max - min <= 1, "{count} split as {split:?}");
        }
    }

    #[test]
    fn interleave_round_robin() {
        let merged = interleave(vec![vec![1, 4, 7], vec![2, 5], vec![3]]);
        assert_eq!(merged, vec![1, 2, 3, 4, 5, 7]);
        assert!(interleave::<u8>(vec![vec![], vec![]]).is_empty());
    }

    #[test]
    fn parse_overrides_category_and_difficulty() {
        let content = r#"{"question": "Q", "questionJapanese": "Q", "options": ["a", "b"],
            "answer": "b", "explanation": "", "explanationJapanese": "",
            "category": "Wrong", "difficulty": "Easy"}"#;
        let q = parse_generated_question(content, "History", Difficulty::Hard).unwrap();
        assert_eq!(q.category, "History");
        assert_eq!(q.difficulty, Difficulty::Hard);
    }

    #[test]
    fn parse_rejects_answer_outside_options() {
        let content = r#"{"question": "Q", "questionJapanese": "Q", "options": ["a", "b"],
            "answer": "z", "explanation": "", "explanationJapanese": ""}"#;
        let err = parse_generated_question(content, "History", Difficulty::Hard).unwrap_err();
        assert!(matches!(err, GenerationError::Invalid(_)));

        assert!(matches!(
            parse_generated_question("```json\n```", "History", Difficulty::Easy),
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            parse_generated_question("not json at all", "History", Difficulty::Easy),
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn prompt_mentions_topic() {
        assert!(question_prompt("Random", Difficulty::Easy).contains("about mixed topics"));
        assert!(question_prompt("Sports", Difficulty::Hard).contains("Hard-difficulty"));
    }

    #[tokio::test]
    async fn zero_count_is_empty() {
        let provider = Arc::new(CountingProvider::new());
        let supply = supply_with(provider.clone(), QuestionCache::in_memory());
        assert!(supply
            .questions(0, "Science", DifficultyChoice::Random)
            .await
            .is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn no_provider_uses_bank() {
        let supply = QuestionSupply::new(None, bank(), QuestionCache::in_memory(), fast_config());
        let qs = supply
            .questions(5, "Science", Difficulty::Hard.into())
            .await;
        assert_eq!(qs.len(), 5);
        assert!(qs.iter().all(|q| q.question == "bundled hard"));
    }

    #[tokio::test]
    async fn cached_questions_come_first_then_fetched() {
        let provider = Arc::new(CountingProvider::new());
        let mut cache = QuestionCache::in_memory();
        cache.extend(
            &cache_key("Science", Difficulty::Easy),
            vec![generated("cached 1"), generated("cached 2")],
        );
        let supply = supply_with(provider.clone(), cache);

        let qs = supply.questions(5, "Science", Difficulty::Easy.into()).await;
        assert_eq!(qs.len(), 5);
        assert_eq!(qs[0].question, "cached 1");
        assert_eq!(qs[1].question, "cached 2");
        assert!(qs[2..].iter().all(|q| q.question.starts_with("Generated")));
        assert!(qs.iter().all(|q| q.answer() == "a" || q.answer() == "c"));
        assert_eq!(provider.calls(), 3);
        assert_eq!(supply.cached("Science", Difficulty::Easy).await, 0);
    }

    #[tokio::test]
    async fn fully_cached_request_makes_no_calls() {
        let provider = Arc::new(CountingProvider::new());
        let mut cache = QuestionCache::in_memory();
        cache.extend(
            &cache_key("Science", Difficulty::Easy),
            (0..4).map(|i| generated(&format!("cached {i}"))),
        );
        let supply = supply_with(provider.clone(), cache);

        let qs = supply.questions(3, "Science", Difficulty::Easy.into()).await;
        assert_eq!(qs.len(), 3);
        assert_eq!(provider.calls(), 0);
        assert_eq!(supply.cached("Science", Difficulty::Easy).await, 1);
    }

    #[tokio::test]
    async fn concurrent_requests_never_share_cached_questions() {
        let provider = Arc::new(CountingProvider::new());
        let mut cache = QuestionCache::in_memory();
        cache.extend(
            &cache_key("Science", Difficulty::Medium),
            (0..10).map(|i| generated(&format!("cached {i}"))),
        );
        let supply = Arc::new(supply_with(provider, cache));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let supply = Arc::clone(&supply);
            handles.push(tokio::spawn(async move {
                supply.questions(3, "Science", Difficulty::Medium.into()).await
            }));
        }

        let mut cached_seen = HashSet::new();
        for handle in handles {
            for q in handle.await.unwrap() {
                if q.question.starts_with("cached") {
                    assert!(cached_seen.insert(q.id), "cached question served twice");
                }
            }
        }
        assert_eq!(cached_seen.len(), 10);
    }

    #[tokio::test]
    async fn failures_fall_back_per_question() {
        let provider = Arc::new(CountingProvider::failing_on("Hard-difficulty", || {
            ProviderError::ApiError {
                status: 500,
                message: "boom".into(),
            }
        }));
        let supply = supply_with(provider.clone(), QuestionCache::in_memory());

        let qs = supply.questions(2, "Science", Difficulty::Hard.into()).await;
        assert_eq!(qs.len(), 2);
        assert!(qs.iter().all(|q| q.question == "bundled hard"));
        // Two questions, each tried once plus two retries.
        assert_eq!(provider.calls(), 6);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let provider = Arc::new(CountingProvider::failing_on("trivia", || {
            ProviderError::AuthenticationFailed("bad key".into())
        }));
        let supply = supply_with(provider.clone(), QuestionCache::in_memory());

        let qs = supply.questions(3, "Science", Difficulty::Easy.into()).await;
        assert_eq!(qs.len(), 3);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn random_difficulty_mixes_levels_evenly() {
        let provider = Arc::new(CountingProvider::failing_on("Hard-difficulty", || {
            ProviderError::NetworkError("down".into())
        }));
        let supply = supply_with(provider, QuestionCache::in_memory());

        for count in [1usize, 2, 5, 7, 9] {
            let qs = supply.questions(count, "Science", DifficultyChoice::Random).await;
            assert_eq!(qs.len(), count);
            assert_even(&level_counts(&qs), &count.to_string());
        }
    }

    #[tokio::test]
    async fn offline_random_difficulty_is_even() {
        let bank = Arc::new(QuestionBank::new(vec![
            question_at("easy", Difficulty::Easy),
            question_at("medium 1", Difficulty::Medium),
            question_at("medium 2", Difficulty::Medium),
            question_at("hard", Difficulty::Hard),
        ]));
        let supply = QuestionSupply::new(None, bank, QuestionCache::in_memory(), fast_config());

        for round in 0..200 {
            let qs = supply.questions(3, "Science", DifficultyChoice::Random).await;
            assert_eq!(qs.len(), 3);
            assert_even(&level_counts(&qs), &format!("round {round}"));
        }
        let qs = supply.questions(6, "Random", DifficultyChoice::Random).await;
        assert_eq!(level_counts(&qs), vec![2, 2, 2]);
    }

    #[tokio::test]
    async fn fallback_keeps_requested_level() {
        let provider = Arc::new(CountingProvider::failing_on("trivia", || {
            ProviderError::AuthenticationFailed("bad key".into())
        }));
        let bank = Arc::new(QuestionBank::new(vec![question_at("only medium", Difficulty::Medium)]));
        let supply = QuestionSupply::new(Some(provider), bank, QuestionCache::in_memory(), fast_config());

        for count in [3usize, 4, 6] {
            let qs = supply.questions(count, "Science", DifficultyChoice::Random).await;
            assert_eq!(qs.len(), count);
            assert!(qs.iter().all(|q| q.question == "only medium"));
            assert_even(&level_counts(&qs), &count.to_string());
        }

        let hard = supply.questions(2, "Science", Difficulty::Hard.into()).await;
        assert!(hard.iter().all(|q| q.difficulty == Difficulty::Hard));
    }

    #[tokio::test]
    async fn restock_margin_goes_to_cache() {
        let provider = Arc::new(CountingProvider::new());
        let supply = QuestionSupply::new(
            Some(provider.clone()),
            bank(),
            QuestionCache::in_memory(),
            SupplyConfig {
                restock_margin: 2,
                ..fast_config()
            },
        );

        let qs = supply.questions(3, "Science", Difficulty::Easy.into()).await;
        assert_eq!(qs.len(), 3);
        assert_eq!(provider.calls(), 5);
        assert_eq!(supply.cached("Science", Difficulty::Easy).await, 2);
    }

    #[tokio::test]
    async fn stock_up_fills_to_target_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let provider = Arc::new(CountingProvider::new());
        let supply = supply_with(provider.clone(), QuestionCache::load(&path));

        let added = supply
            .stock_up("History", DifficultyChoice::Random, 2, &NoopStockReporter)
            .await
            .unwrap();
        assert_eq!(added, 6);
        let again = supply
            .stock_up("History", Difficulty::Easy.into(), 3, &NoopStockReporter)
            .await
            .unwrap();
        assert_eq!(again, 1);
        assert_eq!(provider.calls(), 7);

        let reloaded = QuestionCache::load(&path);
        assert_eq!(reloaded.len("History_Easy"), 3);
        assert_eq!(reloaded.len("History_Hard"), 2);
    }

    #[tokio::test]
    async fn stock_up_without_provider_fails() {
        let supply = QuestionSupply::new(None, bank(), QuestionCache::in_memory(), fast_config());
        assert!(supply
            .stock_up("History", DifficultyChoice::Random, 2, &NoopStockReporter)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn stock_up_reports_each_generation() {
        let provider = Arc::new(CountingProvider::failing_on("Hard-difficulty", || {
            ProviderError::ModelNotFound("gone".into())
        }));
        let mut cache = QuestionCache::in_memory();
        cache.extend(&cache_key("History", Difficulty::Easy), vec![generated("cached")]);
        let supply = supply_with(provider, cache);
        let reporter = RecordingReporter::default();

        let added = supply
            .stock_up("History", DifficultyChoice::Random, 3, &reporter)
            .await
            .unwrap();

        // Easy needs 2, Medium 3, Hard 3 (all failing).
        assert_eq!(added, 5);
        let progress = reporter.progress.lock().unwrap().clone();
        assert_eq!(progress, (1..=8).map(|i| (i, 8)).collect::<Vec<_>>());
        assert_eq!(reporter.errors.load(Ordering::SeqCst), 3);
        assert_eq!(*reporter.finished.lock().unwrap(), Some((5, 3)));
    }
}
