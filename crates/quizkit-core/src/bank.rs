//! Bundled question bank, the last-resort source of questions.
//!
//! The bank is a directory of `questions_*.json` files, each holding a JSON
//! array of questions. A single `questions.json` is read only when the split
//! files yield nothing. Entries that fail to decode (including an answer that
//! is not among the options) are skipped with a warning.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::{is_random_category, Difficulty, DifficultyChoice, QuizQuestion, VocabularyEntry};

/// Contents of one bank file.
#[derive(Debug)]
pub struct BankFile {
    pub path: PathBuf,
    pub questions: Vec<QuizQuestion>,
    /// `(index in file, reason)` for every entry that was skipped.
    pub rejected: Vec<(usize, String)>,
}

/// Parse one bank file, keeping the valid entries.
pub fn parse_bank_file(path: &Path) -> Result<BankFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question file: {}", path.display()))?;
    parse_bank_str(&content, path)
}

/// Parse bank JSON from a string (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<BankFile> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(content)
        .with_context(|| format!("expected a JSON array of questions: {}", source_path.display()))?;

    let mut questions = Vec::with_capacity(entries.len());
    let mut rejected = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<QuizQuestion>(entry) {
            Ok(q) => questions.push(q),
            Err(e) => rejected.push((index, e.to_string())),
        }
    }

    Ok(BankFile {
        path: source_path.to_path_buf(),
        questions,
        rejected,
    })
}

/// List the split bank files (`questions_*.json`) in `dir`, sorted by name.
pub fn bank_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        let is_split_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("questions_") && n.ends_with(".json"));
        if is_split_file && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// In-memory pool of bundled questions.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<QuizQuestion>,
}

impl QuestionBank {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self { questions }
    }

    /// Load every bank file in `dir`. A missing directory gives an empty bank.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            tracing::warn!(
                "question bank directory {} not found, using the built-in sample",
                dir.display()
            );
            return Ok(Self::default());
        }

        let mut questions = Vec::new();
        for path in bank_files(dir)? {
            match parse_bank_file(&path) {
                Ok(file) => {
                    for (index, reason) in &file.rejected {
                        tracing::warn!("skipping {}[{index}]: {reason}", path.display());
                    }
                    questions.extend(file.questions);
                }
                Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
            }
        }

        if questions.is_empty() {
            let single = dir.join("questions.json");
            if single.is_file() {
                let file = parse_bank_file(&single)?;
                for (index, reason) in &file.rejected {
                    tracing::warn!("skipping {}[{index}]: {reason}", single.display());
                }
                questions = file.questions;
            }
        }

        tracing::debug!("loaded {} bundled questions from {}", questions.len(), dir.display());
        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Questions matching `category` and `difficulty`, widening each filter
    /// when it would leave nothing.
    pub fn filtered(&self, category: &str, difficulty: DifficultyChoice) -> Vec<&QuizQuestion> {
        let category_pool: Vec<&QuizQuestion> = if is_random_category(category) {
            self.questions.iter().collect()
        } else {
            let matches: Vec<_> = self
                .questions
                .iter()
                .filter(|q| q.category == category)
                .collect();
            if matches.is_empty() {
                self.questions.iter().collect()
            } else {
                matches
            }
        };

        if difficulty == DifficultyChoice::Random {
            return category_pool;
        }

        let difficulty_pool: Vec<_> = category_pool
            .iter()
            .copied()
            .filter(|q| difficulty.accepts(q.difficulty))
            .collect();
        if difficulty_pool.is_empty() {
            category_pool
        } else {
            difficulty_pool
        }
    }

    /// `count` questions drawn without replacement, reshuffling the pool
    /// whenever it runs out.
    pub fn sample(
        &self,
        count: usize,
        category: &str,
        difficulty: DifficultyChoice,
    ) -> Vec<QuizQuestion> {
        self.sample_with(&mut rand::thread_rng(), count, category, difficulty)
    }

    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        category: &str,
        difficulty: DifficultyChoice,
    ) -> Vec<QuizQuestion> {
        draw(rng, self.filtered(category, difficulty), count)
    }

    /// Questions at exactly `difficulty`: the category's when it has any,
    /// otherwise every category's. Empty when the bank has no such level.
    pub fn at_level(&self, category: &str, difficulty: Difficulty) -> Vec<&QuizQuestion> {
        let level: Vec<&QuizQuestion> = self
            .questions
            .iter()
            .filter(|q| q.difficulty == difficulty)
            .collect();
        if is_random_category(category) {
            return level;
        }
        let in_category: Vec<_> = level
            .iter()
            .copied()
            .filter(|q| q.category == category)
            .collect();
        if in_category.is_empty() {
            level
        } else {
            in_category
        }
    }

    /// `count` questions served as `difficulty`. Exact-level questions are
    /// used whenever the bank has any; otherwise the widened pool is
    /// relabelled to the requested level.
    pub fn sample_level(&self, count: usize, category: &str, difficulty: Difficulty) -> Vec<QuizQuestion> {
        let mut rng = rand::thread_rng();
        let exact = self.at_level(category, difficulty);
        if !exact.is_empty() {
            return draw(&mut rng, exact, count);
        }
        draw(&mut rng, self.filtered(category, difficulty.into()), count)
            .into_iter()
            .map(|q| q.with_difficulty(difficulty))
            .collect()
    }

    /// One question served as `difficulty`, see [`QuestionBank::sample_level`].
    pub fn pick_level(&self, category: &str, difficulty: Difficulty) -> QuizQuestion {
        self.sample_level(1, category, difficulty)
            .pop()
            .unwrap_or_else(|| sample_question().with_difficulty(difficulty))
    }

}

/// `count` questions drawn without replacement from `base`, reshuffling
/// whenever it runs out. An empty `base` yields the built-in sample.
fn draw<R: Rng + ?Sized>(rng: &mut R, base: Vec<&QuizQuestion>, count: usize) -> Vec<QuizQuestion> {
    if base.is_empty() {
        return (0..count).map(|_| sample_question()).collect();
    }

    let mut result = Vec::with_capacity(count);
    let mut pool: Vec<&QuizQuestion> = Vec::new();
    while result.len() < count {
        if pool.is_empty() {
            pool = base.clone();
            pool.shuffle(rng);
        }
        if let Some(q) = pool.pop() {
            result.push(q.clone());
        }
    }
    result
}

/// The question served when the bank is empty.
pub fn sample_question() -> QuizQuestion {
    let options = ["Nucleus", "Ribosome", "Chloroplast", "Mitochondrion"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut q = QuizQuestion::new("What is the powerhouse of the cell?", options, "Mitochondrion")
        .unwrap_or_else(|_| unreachable!("built-in sample answer is among its options"))
        .with_category("Science");
    q.question_japanese = "細胞のエネルギー源は何ですか？".into();
    q.explanation = "Mitochondria produce most of the cell's ATP, so they are often called the powerhouse of the cell.".into();
    q.explanation_japanese =
        "ミトコンドリアは細胞のATPの大部分を生成し、細胞の発電所と呼ばれます。".into();
    q.vocabulary = vec![
        VocabularyEntry::new("powerhouse", "発電所、主な供給源"),
        VocabularyEntry::new("produce", "生み出す"),
        VocabularyEntry::new("ATP", "アデノシン三リン酸、エネルギー"),
    ];
    q
}
