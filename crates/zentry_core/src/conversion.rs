//! Conversion rates between accounting systems.
//!
//! A conversion graph names two systems and a direction:
//!
//! | written       | stored as                       |
//! |---------------|---------------------------------|
//! | `USD -> IDR`  | `USD -> IDR`                    |
//! | `USD <- IDR`  | `IDR -> USD`                    |
//! | `USD <-> SGD` | `USD -> SGD` and `SGD -> USD`   |
//!
//! Every stored pair follows `from * rate = to`. The reverse pair of a
//! bidirectional graph carries `1 / rate`. Each stored pair is a versioned
//! fact whose effective start is the rate's `rate_since`.

use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use crate::version::SetOutcome;
use chrono::{DateTime, Utc};
use std::fmt;
use zentry_codec::{LogicalKey, Timestamp};

const RATE_PAYLOAD_LEN: usize = 16;

/// A parsed conversion graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversionGraph {
    from: String,
    to: String,
    bidirectional: bool,
}

impl ConversionGraph {
    /// Parses `"A -> B"`, `"A <- B"` or `"A <-> B"`.
    ///
    /// System ids are letters, digits and `_`. Whitespace around the arrow
    /// is optional.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConversion`] if there is no arrow, a
    /// system id is empty or malformed, or both sides name the same system.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let (left, arrow, right) = ["<->", "->", "<-"]
            .into_iter()
            .find_map(|arrow| {
                text.split_once(arrow)
                    .map(|(left, right)| (left.trim(), arrow, right.trim()))
            })
            .ok_or_else(|| {
                CoreError::invalid_conversion(format!("{text:?} has no ->, <- or <-> arrow"))
            })?;

        validate_system(text, left)?;
        validate_system(text, right)?;
        if left == right {
            return Err(CoreError::invalid_conversion(format!(
                "{text:?} converts a system to itself"
            )));
        }

        let (from, to) = if arrow == "<-" {
            (right, left)
        } else {
            (left, right)
        };
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            bidirectional: arrow == "<->",
        })
    }

    /// Returns the source system of the forward pair.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.from
    }

    /// Returns the target system of the forward pair.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.to
    }

    /// Returns whether the graph also stores the reverse pair.
    #[must_use]
    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    /// Returns the key of the forward pair, `"from -> to"`.
    pub fn forward_key(&self) -> CoreResult<LogicalKey> {
        Ok(LogicalKey::new(format!("{} -> {}", self.from, self.to))?)
    }

    /// Returns the key of the reverse pair, for bidirectional graphs.
    pub fn reverse_key(&self) -> CoreResult<Option<LogicalKey>> {
        if !self.bidirectional {
            return Ok(None);
        }
        Ok(Some(LogicalKey::new(format!(
            "{} -> {}",
            self.to, self.from
        ))?))
    }
}

impl fmt::Display for ConversionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = if self.bidirectional { "<->" } else { "->" };
        write!(f, "{} {arrow} {}", self.from, self.to)
    }
}

fn validate_system(text: &str, id: &str) -> CoreResult<()> {
    if id.is_empty() {
        return Err(CoreError::invalid_conversion(format!(
            "{text:?} is missing a system id"
        )));
    }
    if !id.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(CoreError::invalid_conversion(format!(
            "system id {id:?} in {text:?} may only contain letters, digits and '_'"
        )));
    }
    Ok(())
}

/// A conversion rate and the instant it took effect.
///
/// Payload layout: `rate f64 LE (8) | rate_since micros i64 LE (8)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    /// `from * rate = to`.
    pub rate: f64,
    /// When the rate took effect.
    pub rate_since: DateTime<Utc>,
}

impl Rate {
    /// Creates a rate, truncating `rate_since` to microseconds.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConversion`] unless `rate` is finite and
    /// positive.
    pub fn new(rate: f64, rate_since: DateTime<Utc>) -> CoreResult<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CoreError::invalid_conversion(format!(
                "rate must be finite and positive, got {rate}"
            )));
        }
        let since = Timestamp::from_datetime(rate_since);
        let rate_since = since.to_datetime().ok_or_else(|| {
            CoreError::invalid_conversion(format!("rate_since {rate_since} is out of range"))
        })?;
        Ok(Self { rate, rate_since })
    }

    /// Returns the rate of the opposite direction.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            rate: 1.0 / self.rate,
            rate_since: self.rate_since,
        }
    }

    /// Returns `rate_since` as a record timestamp.
    #[must_use]
    pub fn since(&self) -> Timestamp {
        Timestamp::from_datetime(self.rate_since)
    }

    /// Encodes the rate payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RATE_PAYLOAD_LEN);
        buf.extend_from_slice(&self.rate.to_le_bytes());
        buf.extend_from_slice(&self.since().as_micros().to_le_bytes());
        buf
    }

    /// Decodes a rate payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConversion`] if the payload is not a
    /// well-formed rate.
    pub fn decode(payload: &[u8]) -> CoreResult<Self> {
        if payload.len() != RATE_PAYLOAD_LEN {
            return Err(CoreError::invalid_conversion(format!(
                "rate payload is {} bytes, expected {RATE_PAYLOAD_LEN}",
                payload.len()
            )));
        }
        let mut rate = [0u8; 8];
        rate.copy_from_slice(&payload[..8]);
        let mut micros = [0u8; 8];
        micros.copy_from_slice(&payload[8..]);

        let rate_since = Timestamp::from_micros(i64::from_le_bytes(micros))
            .to_datetime()
            .ok_or_else(|| CoreError::invalid_conversion("rate_since is out of range"))?;
        Self::new(f64::from_le_bytes(rate), rate_since)
    }
}

/// One superseded rate with its effective range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePeriod {
    /// Instant the rate became current (inclusive).
    pub valid_from: Timestamp,
    /// Instant it was superseded (exclusive).
    pub valid_to: Timestamp,
    /// The rate.
    pub rate: Rate,
}

impl Store {
    /// Sets the rate of `graph`, effective from `rate_since`.
    ///
    /// A bidirectional graph sets both pairs; the reverse pair gets
    /// `1 / rate`. Both pairs are checked before either is written. Returns
    /// the outcome per stored pair, forward pair first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConversion`] for a bad rate, or any error
    /// of [`Store::set_current`].
    pub fn set_rate(
        &self,
        graph: &ConversionGraph,
        rate: f64,
        rate_since: DateTime<Utc>,
    ) -> CoreResult<Vec<(LogicalKey, SetOutcome)>> {
        let forward = Rate::new(rate, rate_since)?;
        let mut pairs = vec![(graph.forward_key()?, forward)];
        if let Some(reverse) = graph.reverse_key()? {
            pairs.push((reverse, forward.inverse()));
        }

        let facts: Vec<_> = pairs
            .into_iter()
            .map(|(key, rate)| (key, rate.encode(), rate.since()))
            .collect();
        let outcomes = self.set_current_all(&facts)?;
        Ok(facts
            .into_iter()
            .map(|(key, _, _)| key)
            .zip(outcomes)
            .collect())
    }

    /// Returns the current rate of the graph's forward pair.
    pub fn current_rate(&self, graph: &ConversionGraph) -> CoreResult<Option<Rate>> {
        self.get_current(&graph.forward_key()?)?
            .map(|payload| Rate::decode(&payload))
            .transpose()
    }

    /// Returns the superseded rates of the graph's forward pair, oldest first.
    pub fn rate_history(&self, graph: &ConversionGraph) -> CoreResult<Vec<RatePeriod>> {
        self.get_history(&graph.forward_key()?)?
            .into_iter()
            .map(|entry| {
                Ok(RatePeriod {
                    valid_from: entry.valid_from,
                    valid_to: entry.valid_to,
                    rate: Rate::decode(&entry.payload)?,
                })
            })
            .collect()
    }
}
