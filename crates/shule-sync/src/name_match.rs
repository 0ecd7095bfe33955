//! Name-match confidence scoring
//!
//! Decides whether two rendered learner names plausibly belong to the same
//! person. The scorer must tolerate token re-ordering (surname/given-name
//! swaps are routine in the remote data) while still penalizing spelling
//! divergence, so it is an approximate, explainable per-token aligner,
//! deliberately not a generic edit-distance metric.

use serde::Serialize;

/// Confidence at or above which a candidate is treated as the same person.
///
/// Two exactly matched tokens of a three-token name score 2/3; that is not
/// enough; one materially different given name must tip the decision to a
/// conflict.
pub const MIN_NAME_CONFIDENCE: f64 = 0.7;

/// How one candidate token aligned against the reference name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenDelta {
    /// The candidate token being aligned.
    pub token: String,
    /// The best-aligned reference token, if any alignment was accepted.
    pub matched: Option<String>,
    /// Character mismatches of the accepted alignment.
    pub mismatches: usize,
}

/// Result of scoring one candidate name against a reference name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameScore {
    /// Total confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Per-token alignment detail, in candidate token order.
    pub deltas: Vec<TokenDelta>,
}

impl NameScore {
    /// Whether this score clears [`MIN_NAME_CONFIDENCE`].
    pub fn is_match(&self) -> bool {
        self.confidence >= MIN_NAME_CONFIDENCE
    }
}

fn tokenize(name: &str) -> Vec<String> {
    name.split_whitespace()
        .map(|t| t.to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Positional character mismatches between two tokens.
///
/// A character of `a` counts as matching when `b` carries the same
/// character at the same position, or shifted by one either direction, which
/// tolerates a single-character insertion or deletion without the
/// bookkeeping of a full alignment. Length difference beyond `a` counts
/// against the pair.
fn token_mismatches(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let span = a.len().max(b.len());
    let mut mismatches = 0;
    for i in 0..span {
        let Some(&ch) = a.get(i) else {
            mismatches += 1;
            continue;
        };
        let aligned = b.get(i) == Some(&ch)
            || (i > 0 && b.get(i - 1) == Some(&ch))
            || b.get(i + 1) == Some(&ch);
        if !aligned {
            mismatches += 1;
        }
    }
    mismatches
}

/// Mismatches tolerated before a token pair is treated as entirely
/// unmatched: small, absolute, and scaled down for short tokens.
fn allowed_mismatches(len: usize) -> usize {
    (len / 4).max(1)
}

/// Score `candidate` against `reference`.
///
/// Identical token sequences score 1.0 outright. Otherwise every candidate
/// token is aligned against its best reference token: an exact token
/// contributes `1/token_count`, a tolerably misspelled one a fraction
/// shrinking with its mismatch count, and anything worse contributes
/// nothing.
pub fn score_name(reference: &str, candidate: &str) -> NameScore {
    let reference_tokens = tokenize(reference);
    let candidate_tokens = tokenize(candidate);

    if candidate_tokens.is_empty() || reference_tokens.is_empty() {
        return NameScore {
            confidence: 0.0,
            deltas: Vec::new(),
        };
    }

    if reference_tokens == candidate_tokens {
        let deltas = candidate_tokens
            .into_iter()
            .map(|token| TokenDelta {
                matched: Some(token.clone()),
                token,
                mismatches: 0,
            })
            .collect();
        return NameScore {
            confidence: 1.0,
            deltas,
        };
    }

    let weight = 1.0 / candidate_tokens.len() as f64;
    let mut confidence = 0.0;
    let mut deltas = Vec::with_capacity(candidate_tokens.len());

    for token in candidate_tokens {
        let best = reference_tokens
            .iter()
            .map(|reference_token| (token_mismatches(&token, reference_token), reference_token))
            .min_by_key(|(mismatches, _)| *mismatches);

        match best {
            Some((0, matched)) => {
                confidence += weight;
                deltas.push(TokenDelta {
                    token,
                    matched: Some(matched.clone()),
                    mismatches: 0,
                });
            }
            Some((mismatches, matched))
                if mismatches <= allowed_mismatches(token.chars().count()) =>
            {
                confidence += weight / (1.0 + mismatches as f64);
                deltas.push(TokenDelta {
                    token,
                    matched: Some(matched.clone()),
                    mismatches,
                });
            }
            _ => {
                deltas.push(TokenDelta {
                    token,
                    matched: None,
                    mismatches: best.map_or(usize::MAX, |(m, _)| m),
                });
            }
        }
    }

    NameScore { confidence, deltas }
}

/// Convenience wrapper returning only the confidence.
pub fn name_confidence(reference: &str, candidate: &str) -> f64 {
    score_name(reference, candidate).confidence
}
