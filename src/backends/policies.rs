use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;

use super::{BackendError, PolicyIndex, PolicyPassage};

const DEFAULT_TOP_K: usize = 3;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "i", "in", "is", "it", "its", "many", "me", "my", "of", "on", "or", "our", "the", "their",
    "this", "to", "was", "what", "when", "which", "who", "will", "with", "you", "your",
];

struct Chunk {
    document: String,
    text: String,
    /// TF-IDF weights, L2-normalised.
    vector: HashMap<String, f64>,
}

/// Ranks policy paragraphs by cosine similarity of TF-IDF vectors.
///
/// Documents are split on blank lines; each paragraph is one retrievable
/// chunk. The index is built once and never mutated afterwards.
pub struct LexicalPolicyIndex {
    documents: Vec<String>,
    chunks: Vec<Chunk>,
    idf: HashMap<String, f64>,
    top_k: usize,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

fn term_frequencies(tokens: &[String]) -> HashMap<String, f64> {
    let mut tf = HashMap::new();
    for token in tokens {
        *tf.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    tf
}

fn normalize(vector: &mut HashMap<String, f64>) {
    let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        vector.values_mut().for_each(|w| *w /= norm);
    }
}

impl LexicalPolicyIndex {
    /// Builds the index from `(document name, full text)` pairs.
    pub fn from_documents(documents: Vec<(String, String)>) -> Self {
        let mut raw_chunks: Vec<(String, String, HashMap<String, f64>)> = Vec::new();
        for (name, text) in &documents {
            for paragraph in text.split("\n\n") {
                let paragraph = paragraph.trim();
                if paragraph.is_empty() {
                    continue;
                }
                let tf = term_frequencies(&tokenize(paragraph));
                if tf.is_empty() {
                    continue;
                }
                raw_chunks.push((name.clone(), paragraph.to_string(), tf));
            }
        }

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for (_, _, tf) in &raw_chunks {
            for term in tf.keys() {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
            }
        }
        let total = raw_chunks.len() as f64;
        let idf: HashMap<String, f64> = document_frequency
            .into_iter()
            .map(|(term, df)| (term.to_string(), ((total + 1.0) / (df as f64 + 1.0)).ln() + 1.0))
            .collect();

        let chunks = raw_chunks
            .into_iter()
            .map(|(document, text, tf)| {
                let mut vector: HashMap<String, f64> = tf
                    .into_iter()
                    .map(|(term, count)| {
                        let weight = count * idf.get(&term).copied().unwrap_or(1.0);
                        (term, weight)
                    })
                    .collect();
                normalize(&mut vector);
                Chunk {
                    document,
                    text,
                    vector,
                }
            })
            .collect();

        let mut names: Vec<String> = documents.into_iter().map(|(name, _)| name).collect();
        names.sort();
        names.dedup();

        Self {
            documents: names,
            chunks,
            idf,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Loads every `.txt` and `.md` file in `dir`.
    pub async fn load(dir: &Path) -> Result<Self, BackendError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackendError::NotFound(format!(
                    "Policies directory {}",
                    dir.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_document = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("txt") | Some("md")
            );
            if !is_document || !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let text = tokio::fs::read_to_string(&path).await?;
            documents.push((name.to_string(), text));
        }

        let index = Self::from_documents(documents);
        tracing::info!(
            "Policy index loaded: {} documents, {} passages",
            index.documents.len(),
            index.chunks.len()
        );
        Ok(index)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    fn rank(&self, query: &str) -> Vec<PolicyPassage> {
        let mut query_vector: HashMap<String, f64> = term_frequencies(&tokenize(query))
            .into_iter()
            .filter_map(|(term, count)| self.idf.get(&term).map(|idf| (term, count * idf)))
            .collect();
        normalize(&mut query_vector);
        if query_vector.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &Chunk)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let score = query_vector
                    .iter()
                    .filter_map(|(term, w)| chunk.vector.get(term).map(|c| c * w))
                    .sum::<f64>();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut seen = HashSet::new();
        scored
            .into_iter()
            .filter(|(_, chunk)| seen.insert(chunk.text.as_str()))
            .take(self.top_k)
            .map(|(score, chunk)| PolicyPassage {
                document: chunk.document.clone(),
                excerpt: chunk.text.clone(),
                score: (score * 1000.0).round() / 1000.0,
            })
            .collect()
    }
}

#[async_trait]
impl PolicyIndex for LexicalPolicyIndex {
    async fn search_policies(&self, query: &str) -> Result<Vec<PolicyPassage>, BackendError> {
        if query.trim().is_empty() {
            return Err(BackendError::InvalidInput("query must not be empty".into()));
        }
        Ok(self.rank(query))
    }

    async fn list_policies(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.documents.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_index() -> LexicalPolicyIndex {
        LexicalPolicyIndex::from_documents(vec![
            (
                "leave_policy.txt".to_string(),
                "Leave Policy\n\n\
                 Sick leave: employees receive 7 days of sick leave per year. A medical \
                 certificate is required for sick leave longer than 2 days.\n\n\
                 Casual leave: 12 days per year, to be applied at least one day in advance.\n\n\
                 Earned leave: 18 days per year, accrued monthly and carried forward up to 45 days."
                    .to_string(),
            ),
            (
                "salary_policy.txt".to_string(),
                "Salary Policy\n\n\
                 Salaries are credited on the last working day of each month.\n\n\
                 Annual increments are decided during the April performance review."
                    .to_string(),
            ),
        ])
    }

    #[test]
    fn tokenizer_drops_stopwords_and_punctuation() {
        assert_eq!(
            tokenize("What is the sick-leave policy?"),
            vec!["sick".to_string(), "leave".to_string(), "policy".to_string()]
        );
    }

    #[tokio::test]
    async fn sick_leave_query_ranks_sick_leave_paragraph_first() {
        let index = sample_index();
        let results = index.search_policies("how many sick leave days do I get").await.unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].document, "leave_policy.txt");
        assert!(results[0].excerpt.starts_with("Sick leave"));
        assert!(results.len() <= DEFAULT_TOP_K);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn salary_query_hits_salary_document() {
        let index = sample_index().with_top_k(1);
        let results = index.search_policies("when is salary credited").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document, "salary_policy.txt");
    }

    #[tokio::test]
    async fn unrelated_query_returns_nothing() {
        let index = sample_index();
        assert!(index.search_policies("spaceship").await.unwrap().is_empty());
        assert!(index.search_policies("   ").await.is_err());
    }

    #[tokio::test]
    async fn loads_documents_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("leave_policy.md"), "Sick leave is 7 days.").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let index = LexicalPolicyIndex::load(dir.path()).await.unwrap();
        assert_eq!(
            index.list_policies().await.unwrap(),
            vec!["leave_policy.md".to_string()]
        );
    }
}
