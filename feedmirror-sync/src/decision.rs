//! Change decision: is a download required for this resource?
//!
//! Rule precedence (first match wins):
//! 1. `NoLocalCopy` (nothing stored at the local path)
//! 2. `ProbeFailed` (metadata request failed; fail open toward downloading)
//! 3. `EntityTagMismatch` (both tags present and unequal)
//! 4. `LastModifiedNewer` (remote strictly newer than cached)
//! 5. `ByteLengthMismatch` (remote length disagrees with the local copy)
//! 6. `LocalHashMismatch` (local bytes no longer match the cached hash)
//! 7. `NoCacheEntry` (local copy present but nothing vouches for it)
//! 8. otherwise unchanged, `NoChangeDetected`
//!
//! Equal entity tags are the strongest signal available: when they match,
//! rules 4 and 5 are not consulted.

use feedmirror_core::{CacheEntry, ChangeReason, ChangeVerdict, RemoteSignals};

use crate::error::ProbeError;
use crate::fingerprint::LocalFingerprint;

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub probe: Result<&'a RemoteSignals, &'a ProbeError>,
    pub cached: Option<&'a CacheEntry>,
    pub local: &'a LocalFingerprint,
}

type Rule = fn(&DecisionInputs<'_>) -> Option<ChangeReason>;

const RULES: [Rule; 7] = [
    no_local_copy,
    probe_failed,
    entity_tag_mismatch,
    last_modified_newer,
    byte_length_mismatch,
    local_hash_mismatch,
    no_cache_entry,
];

/// Classify a resource from its probe result, cache entry, and local copy.
pub fn decide(
    probe: Result<&RemoteSignals, &ProbeError>,
    cached: Option<&CacheEntry>,
    local: &LocalFingerprint,
) -> ChangeVerdict {
    let inputs = DecisionInputs {
        probe,
        cached,
        local,
    };
    RULES
        .iter()
        .find_map(|rule| rule(&inputs))
        .map(ChangeVerdict::changed)
        .unwrap_or_else(ChangeVerdict::unchanged)
}

fn no_local_copy(inputs: &DecisionInputs<'_>) -> Option<ChangeReason> {
    matches!(inputs.local, LocalFingerprint::Absent).then_some(ChangeReason::NoLocalCopy)
}

fn probe_failed(inputs: &DecisionInputs<'_>) -> Option<ChangeReason> {
    inputs.probe.is_err().then_some(ChangeReason::ProbeFailed)
}

fn entity_tag_mismatch(inputs: &DecisionInputs<'_>) -> Option<ChangeReason> {
    let (remote, cached) = entity_tags(inputs)?;
    (remote != cached).then_some(ChangeReason::EntityTagMismatch)
}

fn last_modified_newer(inputs: &DecisionInputs<'_>) -> Option<ChangeReason> {
    if entity_tags_match(inputs) {
        return None;
    }
    let remote = inputs.probe.ok()?.last_modified?;
    let cached = inputs.cached?.last_modified?;
    (remote > cached).then_some(ChangeReason::LastModifiedNewer)
}

fn byte_length_mismatch(inputs: &DecisionInputs<'_>) -> Option<ChangeReason> {
    if entity_tags_match(inputs) {
        return None;
    }
    let remote = inputs.probe.ok()?.byte_length?;
    let local_size = inputs.local.size()?;
    (remote != remote_length_of_local_copy(inputs.cached, local_size))
        .then_some(ChangeReason::ByteLengthMismatch)
}

fn local_hash_mismatch(inputs: &DecisionInputs<'_>) -> Option<ChangeReason> {
    let expected = inputs.cached?.content_hash.as_deref()?;
    let actual = inputs.local.hash()?;
    (expected != actual).then_some(ChangeReason::LocalHashMismatch)
}

fn no_cache_entry(inputs: &DecisionInputs<'_>) -> Option<ChangeReason> {
    inputs.cached.is_none().then_some(ChangeReason::NoCacheEntry)
}

fn entity_tags<'a>(inputs: &DecisionInputs<'a>) -> Option<(&'a str, &'a str)> {
    let remote = inputs.probe.ok()?.entity_tag.as_deref()?;
    let cached = inputs.cached?.entity_tag.as_deref()?;
    Some((remote, cached))
}

fn entity_tags_match(inputs: &DecisionInputs<'_>) -> bool {
    entity_tags(inputs).is_some_and(|(remote, cached)| remote == cached)
}

/// The remote body length the local file stands for.
///
/// A sanitized copy is smaller than the body it came from. When the local
/// file is still exactly what was stored, compare against the body length
/// recorded at download time; otherwise the actual size is all we have.
fn remote_length_of_local_copy(cached: Option<&CacheEntry>, local_size: u64) -> u64 {
    match cached {
        Some(entry) if entry.stored_length == Some(local_size) => {
            entry.byte_length.unwrap_or(local_size)
        }
        _ => local_size,
    }
}
