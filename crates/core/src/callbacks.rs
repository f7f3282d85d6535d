//! Client callback interface and tagged output records.
//!
//! [`ClientUserCallbacks`] is the one capability a caller implements to
//! receive output and answer prompts. Every method has a default, so an
//! implementation only overrides what it needs.

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{info, warn};

use crate::errors::ResolveError;
use crate::merge::{MergeAction, MergeData};

/// Keys carried by server records that are never shown to callers.
const INTERNAL_KEYS: &[&str] = &["specdef", "func", "specFormatted"];

// ---------------------------------------------------------------------------
// StatRecord
// ---------------------------------------------------------------------------

/// A tagged key/value record that keeps insertion order.
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatRecord {
    fields: Vec<(String, String)>,
}

impl StatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from raw pairs, dropping internal keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            let key = key.into();
            if !INTERNAL_KEYS.contains(&key.as_str()) {
                record.insert(key, value);
            }
        }
        record
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for StatRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Synchronous client callbacks.
pub trait ClientUserCallbacks {
    /// Ask the user for a line of input.
    ///
    /// The default has no user to ask and fails.
    fn prompt(&mut self, message: &str, no_echo: bool) -> Result<String, ResolveError> {
        let _ = no_echo;
        Err(ResolveError::PromptFailed(format!(
            "no interactive user to answer '{}'",
            message.trim()
        )))
    }

    /// Informational output.
    fn output_info(&mut self, text: &str) {
        info!(text, "client output");
    }

    /// Error output.
    fn output_error(&mut self, text: &str) {
        warn!(text, "client error");
    }

    /// A tagged record.
    fn output_stat(&mut self, record: &StatRecord) {
        let _ = record;
    }

    /// Choose how to resolve one file. Defaults to [`prompt_for_action`].
    fn resolve(&mut self, data: &MergeData) -> Result<MergeAction, ResolveError> {
        prompt_for_action(self, data)
    }
}

/// Ask for a merge action through `callbacks.prompt`.
///
/// The hint is offered as the suggested answer; an empty response accepts
/// the suggestion.
pub fn prompt_for_action<C>(callbacks: &mut C, data: &MergeData) -> Result<MergeAction, ResolveError>
where
    C: ClientUserCallbacks + ?Sized,
{
    let suggested = MergeAction::for_outcome(data.hint()?);
    let message = format!(
        "Accept merged(am) edited(ae) theirs(at) yours(ay), Skip(s), Quit(q) [{}]: ",
        suggested.key()
    );
    let response = callbacks.prompt(&message, false)?;
    if response.trim().is_empty() {
        Ok(suggested)
    } else {
        response.parse()
    }
}
