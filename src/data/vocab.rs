//! Label vocabularies and the (adverb, action) pair table

use crate::{Error, Result};
use std::collections::HashMap;

/// Bidirectional label ↔ dense index mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocab {
    kind: &'static str,
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocab {
    /// Build a vocabulary; `kind` ("adverb", "action") is used in error messages
    pub fn new<I, S>(kind: &'static str, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self {
            kind,
            labels: Vec::new(),
            index: HashMap::new(),
        };
        for label in labels {
            let label = label.into();
            if vocab.index.contains_key(&label) {
                return Err(Error::Dataset(format!("duplicate {kind} label: {label}")));
            }
            vocab.index.insert(label.clone(), vocab.labels.len());
            vocab.labels.push(label);
        }
        Ok(vocab)
    }

    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| Error::UnknownLabel {
                kind: self.kind,
                label: label.to_string(),
            })
    }

    pub fn label(&self, index: usize) -> Result<&str> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(Error::IndexOutOfRange {
                what: self.kind,
                index,
                len: self.labels.len(),
            })
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// One point of the target space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub adverb: usize,
    pub action: usize,
}

/// Ordered, index-addressable universe of pairs
///
/// Pair `i` is column `i` of every score matrix, so train and test data
/// built from the same source must share one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairTable {
    pairs: Vec<Pair>,
    by_action: Vec<Vec<usize>>,
    num_adverbs: usize,
}

impl PairTable {
    pub fn new(pairs: Vec<Pair>, num_adverbs: usize, num_actions: usize) -> Result<Self> {
        let mut by_action = vec![Vec::new(); num_actions];
        for (i, pair) in pairs.iter().enumerate() {
            if pair.adverb >= num_adverbs {
                return Err(Error::IndexOutOfRange {
                    what: "adverb",
                    index: pair.adverb,
                    len: num_adverbs,
                });
            }
            if pair.action >= num_actions {
                return Err(Error::IndexOutOfRange {
                    what: "action",
                    index: pair.action,
                    len: num_actions,
                });
            }
            if pairs[..i].contains(pair) {
                return Err(Error::Dataset(format!(
                    "duplicate pair (adverb {}, action {})",
                    pair.adverb, pair.action
                )));
            }
            by_action[pair.action].push(i);
        }
        Ok(Self {
            pairs,
            by_action,
            num_adverbs,
        })
    }

    /// Resolve labelled pairs against both vocabularies
    pub fn from_labels<S: AsRef<str>>(
        labelled: &[(S, S)],
        adverbs: &Vocab,
        actions: &Vocab,
    ) -> Result<Self> {
        let pairs = labelled
            .iter()
            .map(|(adverb, action)| {
                Ok(Pair {
                    adverb: adverbs.index_of(adverb.as_ref())?,
                    action: actions.index_of(action.as_ref())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(pairs, adverbs.len(), actions.len())
    }

    pub fn get(&self, index: usize) -> Result<Pair> {
        self.pairs.get(index).copied().ok_or(Error::IndexOutOfRange {
            what: "pair",
            index,
            len: self.pairs.len(),
        })
    }

    pub fn adverb_of(&self, index: usize) -> Result<usize> {
        self.get(index).map(|pair| pair.adverb)
    }

    /// Pair indices whose action is `action`, in table order
    pub fn indices_for_action(&self, action: usize) -> &[usize] {
        self.by_action.get(action).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Index of the pair (adverb, action), if it exists
    pub fn lookup(&self, adverb: usize, action: usize) -> Option<usize> {
        self.indices_for_action(action)
            .iter()
            .copied()
            .find(|&i| self.pairs[i].adverb == adverb)
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn num_adverbs(&self) -> usize {
        self.num_adverbs
    }

    pub fn num_actions(&self) -> usize {
        self.by_action.len()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
