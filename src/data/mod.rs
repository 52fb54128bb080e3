// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between files on disk and id-based passages:
//
//   corpus.jsonl ──► JsonlCorpus ──► RawPassage
//                                        │
//                                        ▼
//   vectors.txt ──► PretrainedVectors ─► Corpus (vocab, actions,
//                                        │       singletons)
//                                        ▼
//                                     Passage ──► UnkPolicy ──► parser
//
//   ParseResult ──► JsonlParseWriter ──► output.jsonl

/// Vocabulary, action set and id-based passages
pub mod corpus;

/// Reads JSON-lines corpora
pub mod loader;

/// Stochastic / deterministic UNK substitution
pub mod oov;

/// Plain-text pretrained word vectors
pub mod pretrained;

/// Word <-> id mapping
pub mod vocab;

/// JSON-lines output of predicted head/relation maps
pub mod writer;
