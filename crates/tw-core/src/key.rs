//! Identity allocation.
//!
//! Every identity is a `u64`. Values below [`RESERVED_BAND`] are sentinels that
//! must be registered by token through [`KeyProvider::reserve`]; values at or
//! above it are handed out by [`KeyProvider::next`] in strictly increasing order.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// First value that can be generated. Everything below is reserved for sentinels.
pub const RESERVED_BAND: u64 = 1024;

/// A typed identity backed by a raw `u64`.
pub trait Key: Copy + Eq + Ord + fmt::Debug {
    /// Wrap a raw value.
    fn from_raw(raw: u64) -> Self;
    /// Unwrap the raw value.
    fn raw(self) -> u64;
}

/// Identity of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

/// Identity of an event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

/// Identity of an output line handed out by an output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u64);

impl Key for AgentId {
    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
    fn raw(self) -> u64 {
        self.0
    }
}

impl Key for EventId {
    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
    fn raw(self) -> u64 {
        self.0
    }
}

impl Key for LineId {
    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
    fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// Serializable progress of a [`KeyProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    /// The next value that will be generated.
    pub next: u64,
    /// Sentinel tokens and their reserved values.
    #[serde(default)]
    pub reserved: BTreeMap<String, u64>,
}

impl Default for KeyState {
    fn default() -> Self {
        Self {
            next: RESERVED_BAND,
            reserved: BTreeMap::new(),
        }
    }
}

/// Allocates unique identities of one kind.
#[derive(Debug, Clone)]
pub struct KeyProvider<K> {
    next: u64,
    reserved: BTreeMap<String, u64>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: Key> Default for KeyProvider<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key> KeyProvider<K> {
    /// A provider that has issued nothing and reserved nothing.
    pub fn new() -> Self {
        Self {
            next: RESERVED_BAND,
            reserved: BTreeMap::new(),
            _kind: PhantomData,
        }
    }

    /// Continue from a previously captured state.
    ///
    /// Fails if the state would make the provider hand out a sentinel value
    /// or if two tokens share one value.
    pub fn resume(state: KeyState) -> StateResult<Self> {
        if state.next < RESERVED_BAND {
            return Err(StateError::IdentityCollision {
                token: "generated".to_string(),
                value: state.next,
            });
        }
        let mut provider = Self {
            next: state.next,
            reserved: BTreeMap::new(),
            _kind: PhantomData,
        };
        for (token, value) in state.reserved {
            provider.reserve(&token, value)?;
        }
        Ok(provider)
    }

    /// Issue a fresh identity.
    pub fn next(&mut self) -> K {
        let key = K::from_raw(self.next);
        self.next += 1;
        key
    }

    /// Register `token` as a sentinel for `value`.
    ///
    /// Re-reserving the same pair is a no-op.
    pub fn reserve(&mut self, token: &str, value: u64) -> StateResult<K> {
        if let Some(&existing) = self.reserved.get(token) {
            if existing == value {
                return Ok(K::from_raw(value));
            }
            return Err(StateError::IdentityCollision {
                token: token.to_string(),
                value,
            });
        }
        let taken = self.reserved.values().any(|v| *v == value);
        if value >= RESERVED_BAND || taken {
            return Err(StateError::IdentityCollision {
                token: token.to_string(),
                value,
            });
        }
        self.reserved.insert(token.to_string(), value);
        Ok(K::from_raw(value))
    }

    /// Look up a sentinel by token.
    pub fn reserved(&self, token: &str) -> Option<K> {
        self.reserved.get(token).map(|v| K::from_raw(*v))
    }

    /// True if `key` is a registered sentinel.
    pub fn is_reserved(&self, key: K) -> bool {
        self.reserved.values().any(|v| *v == key.raw())
    }

    /// The most recently generated identity, if any.
    pub fn last_issued(&self) -> Option<K> {
        (self.next > RESERVED_BAND).then(|| K::from_raw(self.next - 1))
    }

    /// Number of identities generated so far.
    pub fn issued(&self) -> u64 {
        self.next - RESERVED_BAND
    }

    /// Capture the current state for recycling or snapshots.
    pub fn state(&self) -> KeyState {
        KeyState {
            next: self.next,
            reserved: self.reserved.clone(),
        }
    }
}
