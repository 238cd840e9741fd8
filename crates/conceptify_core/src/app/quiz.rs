//! crates/conceptify_core/src/app/quiz.rs
//!
//! Quiz-taking over a fixed question set, scoring and the append-only history.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::info;

use crate::domain::{ActiveTest, QuestionAnswer, QuizQuestion, ResultSummary, TestRecord};
use crate::storage::{
    load_json, save_json, KeyValueStore, StorageError, CURRENT_TEST_RESULT_KEY, TEST_HISTORY_KEY,
};

/// The question set every test currently uses. It does not depend on the
/// document; generating questions from content is not implemented.
pub fn fixed_questions() -> Vec<QuizQuestion> {
    let q = |id, question: &str, options: [&str; 4], correct_answer| QuizQuestion {
        id,
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer,
    };
    vec![
        q(
            1,
            "What is the main topic discussed in this document?",
            [
                "Machine Learning Fundamentals",
                "Web Development",
                "Database Management",
                "Network Security",
            ],
            0,
        ),
        q(
            2,
            "Which of the following concepts is emphasized in the text?",
            [
                "Object-Oriented Programming",
                "Data Structures",
                "Algorithm Optimization",
                "Software Testing",
            ],
            2,
        ),
        q(
            3,
            "According to the document, what is the key benefit of the discussed approach?",
            [
                "Faster execution time",
                "Lower memory usage",
                "Better scalability",
                "Easier maintenance",
            ],
            2,
        ),
        q(
            4,
            "Which method is recommended in the document?",
            [
                "Waterfall methodology",
                "Agile methodology",
                "Spiral model",
                "V-model",
            ],
            1,
        ),
        q(
            5,
            "What conclusion does the document reach?",
            [
                "More research is needed",
                "The approach is highly effective",
                "Results are inconclusive",
                "Traditional methods are better",
            ],
            1,
        ),
    ]
}

/// `round(100 * correct / total)`; an empty test scores 0.
pub fn score(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn of(score: u32) -> Self {
        match score {
            s if s >= 70 => ScoreBand::High,
            s if s >= 50 => ScoreBand::Medium,
            _ => ScoreBand::Low,
        }
    }
}

pub fn start_test(document: &ResultSummary, at: DateTime<Utc>) -> ActiveTest {
    ActiveTest {
        document_id: document.filename.clone(),
        document_name: document.original_name.clone(),
        timestamp: at,
    }
}

/// Grades a set of answers keyed by question index. Unanswered questions and
/// out-of-range indices count as incorrect.
pub fn grade(
    test: &ActiveTest,
    questions: &[QuizQuestion],
    answers: &BTreeMap<usize, usize>,
    at: DateTime<Utc>,
) -> TestRecord {
    let detailed: Vec<QuestionAnswer> = questions
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            let selected = answers.get(&idx).copied();
            QuestionAnswer {
                question: q.question.clone(),
                selected_answer: selected,
                correct_answer: q.correct_answer,
                is_correct: selected == Some(q.correct_answer),
            }
        })
        .collect();
    let correct = detailed.iter().filter(|a| a.is_correct).count();

    TestRecord {
        document_id: test.document_id.clone(),
        document_name: test.document_name.clone(),
        timestamp: at,
        score: score(correct, questions.len()),
        questions_answered: answers.keys().filter(|idx| **idx < questions.len()).count(),
        total_questions: questions.len(),
        correct_answers: correct,
        detailed_answers: Some(detailed),
    }
}

//=========================================================================================
// Test in progress
//=========================================================================================

/// Navigation and answer state for one quiz attempt.
#[derive(Debug, Clone)]
pub struct QuizSession {
    test: ActiveTest,
    questions: Vec<QuizQuestion>,
    answers: BTreeMap<usize, usize>,
    current: usize,
}

impl QuizSession {
    pub fn new(test: ActiveTest) -> Self {
        Self::with_questions(test, fixed_questions())
    }

    pub fn with_questions(test: ActiveTest, questions: Vec<QuizQuestion>) -> Self {
        Self {
            test,
            questions,
            answers: BTreeMap::new(),
            current: 0,
        }
    }

    pub fn test(&self) -> &ActiveTest {
        &self.test
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    /// Records an answer. Returns `false` for an unknown question or option.
    pub fn select_answer(&mut self, question: usize, option: usize) -> bool {
        match self.questions.get(question) {
            Some(q) if option < q.options.len() => {
                self.answers.insert(question, option);
                true
            }
            _ => false,
        }
    }

    pub fn next(&mut self) {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
    }

    pub fn previous(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn submit(&self, at: DateTime<Utc>) -> TestRecord {
        grade(&self.test, &self.questions, &self.answers, at)
    }
}

//=========================================================================================
// History
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestStats {
    pub total_tests: usize,
    pub completed_tests: usize,
    pub pending_tests: usize,
    pub average_score: u32,
}

/// Append-only list of finished tests. Records are never edited; the whole
/// list can only be cleared.
pub struct TestHistory {
    store: Arc<dyn KeyValueStore>,
}

impl TestHistory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn records(&self) -> Result<Vec<TestRecord>, StorageError> {
        Ok(load_json(self.store.as_ref(), TEST_HISTORY_KEY)?.unwrap_or_default())
    }

    pub fn newest_first(&self) -> Result<Vec<TestRecord>, StorageError> {
        let mut records = self.records()?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    pub fn append(&self, record: TestRecord) -> Result<(), StorageError> {
        let mut records = self.records()?;
        info!(
            "Recording test for {} with score {}",
            record.document_id, record.score
        );
        records.push(record);
        save_json(self.store.as_ref(), TEST_HISTORY_KEY, &records)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(TEST_HISTORY_KEY)
    }

    /// Score of the most recent test taken on a document.
    pub fn latest_score(&self, document_id: &str) -> Result<Option<u32>, StorageError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.document_id == document_id)
            .max_by_key(|r| r.timestamp)
            .map(|r| r.score))
    }

    pub fn is_completed(&self, document_id: &str) -> Result<bool, StorageError> {
        Ok(self.records()?.iter().any(|r| r.document_id == document_id))
    }

    pub fn stats(&self, documents: &[ResultSummary]) -> Result<TestStats, StorageError> {
        let records = self.records()?;
        let completed: HashSet<&str> = records.iter().map(|r| r.document_id.as_str()).collect();
        let pending = documents
            .iter()
            .filter(|d| !completed.contains(d.filename.as_str()))
            .count();
        let average_score = if records.is_empty() {
            0
        } else {
            let total: u64 = records.iter().map(|r| r.score as u64).sum();
            (total as f64 / records.len() as f64).round() as u32
        };

        Ok(TestStats {
            total_tests: documents.len(),
            completed_tests: records.len(),
            pending_tests: pending,
            average_score,
        })
    }

    /// Keeps the last finished test around so the result view survives a reload.
    pub fn set_current_result(&self, record: &TestRecord) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), CURRENT_TEST_RESULT_KEY, record)
    }

    pub fn current_result(&self) -> Result<Option<TestRecord>, StorageError> {
        load_json(self.store.as_ref(), CURRENT_TEST_RESULT_KEY)
    }

    pub fn clear_current_result(&self) -> Result<(), StorageError> {
        self.store.remove(CURRENT_TEST_RESULT_KEY)
    }
}
