//! Content checksums for published snapshots.
//!
//! The digest covers `(values, narrative, schema_version)` in a canonical
//! form: the value map serializes key-ordered (it is a `BTreeMap`), and the
//! three sections are framed with a record separator so their boundaries
//! cannot be confused. The checksum is computed once at publish time; it is
//! only ever recomputed transiently for comparison during an integrity
//! check.

use serde::Serialize;
use sha2::Digest;

use crf_model::report::{NarrativeDocument, PublishedSnapshot};
use crf_model::value::ValueMap;

/// ASCII record separator between checksum input sections.
const SECTION_SEP: u8 = 0x1e;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}

/// Compute the publish checksum over values, narrative, and schema version.
///
/// # Errors
///
/// Fails only if a value cannot be serialized (e.g. a non-finite number).
pub fn snapshot_checksum(
    values: &ValueMap,
    narrative: &NarrativeDocument,
    schema_version: u32,
) -> Result<String, serde_json::Error> {
    let mut input = Vec::new();
    append_canonical(&mut input, values)?;
    input.push(SECTION_SEP);
    append_canonical(&mut input, narrative)?;
    input.push(SECTION_SEP);
    input.extend_from_slice(schema_version.to_string().as_bytes());
    Ok(sha256_hex(&input))
}

fn append_canonical<T: Serialize>(buf: &mut Vec<u8>, value: &T) -> Result<(), serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    buf.extend_from_slice(&json);
    Ok(())
}

/// Result of an integrity check. A mismatch is advisory: it is reported
/// and logged but never blocks retrieval of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IntegrityReport {
    pub work_item_id: String,
    pub version: u32,
    pub matches: bool,
    pub stored_checksum: String,
    pub computed_checksum: String,
}

/// Recompute a snapshot's digest and compare it to the stored checksum.
pub fn verify_snapshot(snapshot: &PublishedSnapshot) -> Result<IntegrityReport, serde_json::Error> {
    let computed = snapshot_checksum(
        &snapshot.values,
        &snapshot.narrative,
        snapshot.schema_version,
    )?;
    let matches = computed == snapshot.checksum;
    if !matches {
        tracing::warn!(
            work_item_id = %snapshot.work_item_id,
            version = snapshot.version,
            "snapshot checksum mismatch: storage corruption or out-of-band tampering"
        );
    }
    Ok(IntegrityReport {
        work_item_id: snapshot.work_item_id.clone(),
        version: snapshot.version,
        matches,
        stored_checksum: snapshot.checksum.clone(),
        computed_checksum: computed,
    })
}
