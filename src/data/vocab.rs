// ============================================================
// Layer 4 — Word Vocabulary
// ============================================================
// Bidirectional word <-> id mapping. Id 0 is always the UNK
// word. Ids are handed out in first-seen order, so loading the
// same training corpus and the same pretrained file always
// reproduces the same mapping. The parse command relies on
// that to line up with a trained checkpoint.

use std::collections::HashMap;

pub const UNK: &str = "<unk>";
pub const UNK_ID: usize = 0;

#[derive(Debug, Clone)]
pub struct Vocabulary {
    id_to_word: Vec<String>,
    word_to_id: HashMap<String, usize>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        let mut vocab = Self {
            id_to_word: Vec::new(),
            word_to_id: HashMap::new(),
        };
        vocab.get_or_insert(UNK);
        vocab
    }

    /// Get or create the id for `word`
    pub fn get_or_insert(&mut self, word: &str) -> usize {
        if let Some(&id) = self.word_to_id.get(word) {
            return id;
        }
        let id = self.id_to_word.len();
        self.id_to_word.push(word.to_string());
        self.word_to_id.insert(word.to_string(), id);
        id
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        self.word_to_id.get(word).copied()
    }

    /// Id of `word`, or UNK when unseen
    pub fn get_or_unk(&self, word: &str) -> usize {
        self.get(word).unwrap_or(UNK_ID)
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.id_to_word.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_word.is_empty()
    }
}
