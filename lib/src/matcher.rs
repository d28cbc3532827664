use crate::error::Error;
use crate::fingerprint::{Fingerprint, HASH_BITS};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// A known card icon
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    pub id: String,
    pub fingerprint: Fingerprint,
}

/// The fingerprints of all known card icons, in the order they were supplied.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceTable {
    /// Build a table from `(identifier, fingerprint text)` pairs.
    ///
    /// # Errors
    /// [Error::InvalidFingerprint] if a fingerprint is not 64 binary digits.
    pub fn from_pairs<I, S, T>(pairs: I) -> Result<ReferenceTable, Error>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .map(|(id, fp)| {
                Ok(ReferenceEntry {
                    id: id.into(),
                    fingerprint: fp.as_ref().parse()?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(ReferenceTable { entries })
    }

    /// Parse a JSON array of `[identifier, fingerprint]` pairs.
    pub fn from_json_str(json: &str) -> Result<ReferenceTable, Error> {
        let pairs: Vec<(String, String)> = serde_json::from_str(json)?;
        ReferenceTable::from_pairs(pairs)
    }

    /// Read a JSON array of `[identifier, fingerprint]` pairs.
    pub fn from_reader<R: Read>(reader: R) -> Result<ReferenceTable, Error> {
        let pairs: Vec<(String, String)> = serde_json::from_reader(reader)?;
        ReferenceTable::from_pairs(pairs)
    }

    pub fn push(&mut self, id: impl Into<String>, fingerprint: Fingerprint) {
        self.entries.push(ReferenceEntry {
            id: id.into(),
            fingerprint,
        });
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A reference icon that resembles a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMatch {
    /// Identifier from the reference table, empty for no match
    pub reference_id: String,
    /// Hamming distance between the fingerprints
    pub distance: u32,
}

impl CandidateMatch {
    /// The candidate that stands for "nothing resembles this cell"
    pub fn no_match() -> CandidateMatch {
        CandidateMatch {
            reference_id: String::new(),
            distance: HASH_BITS,
        }
    }

    pub fn is_no_match(&self) -> bool {
        self.distance == HASH_BITS
    }

    /// Similarity in percent, 100 for identical fingerprints
    pub fn similarity(&self) -> f64 {
        (1.0 - self.distance as f64 / HASH_BITS as f64) * 100.0
    }
}

/// Distance limits for [Matcher]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Candidates further away than this are ignored
    pub max_distance: u32,
    /// A best candidate this close is taken as the only answer
    pub unambiguous_distance: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            max_distance: 16,
            unambiguous_distance: 10,
        }
    }
}

/// Nearest neighbour search over a [ReferenceTable]
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: &MatchConfig) -> Matcher {
        Matcher {
            config: config.clone(),
        }
    }

    /// Rank the reference entries that resemble `fp`.
    ///
    /// - no entry within `max_distance`: a single [CandidateMatch::no_match]
    /// - best entry within `unambiguous_distance`: only that entry
    /// - otherwise all entries within `max_distance`, closest first. Entries at the same distance keep
    ///   their table order.
    pub fn find_candidates(&self, fp: &Fingerprint, table: &ReferenceTable) -> Vec<CandidateMatch> {
        let mut matches: Vec<CandidateMatch> = table
            .entries()
            .iter()
            .map(|entry| CandidateMatch {
                reference_id: entry.id.clone(),
                distance: entry.fingerprint.distance(fp),
            })
            .filter(|m| m.distance <= self.config.max_distance)
            .collect();
        matches.sort_by_key(|m| m.distance);
        match matches.first() {
            None => vec![CandidateMatch::no_match()],
            Some(best) if best.distance <= self.config.unambiguous_distance => {
                matches.truncate(1);
                matches
            }
            Some(_) => {
                debug!("ambiguous match: {} candidates", matches.len());
                matches
            }
        }
    }
}
