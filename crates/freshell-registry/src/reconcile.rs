//! Merge local and remote registry records into display groups.
//!
//! Pure function of its inputs: no transport, no clock.

use std::collections::{HashMap, HashSet};

use freshell_core::id::is_device_tab;
use freshell_core::registry::{RegistryGroups, RegistryTabRecord};
use freshell_core::time::DAY_MS;

pub struct ReconcileInput<'a> {
    pub device_id: &'a str,
    /// Records for tabs open on this device right now, in tab order.
    pub local_open: &'a [RegistryTabRecord],
    /// This device's closed history.
    pub local_closed: &'a [RegistryTabRecord],
    /// Latest snapshot from the server, if any.
    pub remote: Option<&'a RegistryGroups>,
    /// Closed records older than this window are hidden.
    pub range_days: u32,
    pub now: i64,
}

/// Keep whichever record is fresher. Ties go to the incoming record when
/// `prefer_incoming` is set.
fn merge_into(
    merged: &mut HashMap<String, RegistryTabRecord>,
    record: &RegistryTabRecord,
    prefer_incoming: bool,
) {
    match merged.get_mut(&record.tab_key) {
        Some(existing) => {
            let ord = record.freshness_cmp(existing);
            if ord.is_gt() || (prefer_incoming && ord.is_eq()) {
                *existing = record.clone();
            }
        }
        None => {
            merged.insert(record.tab_key.clone(), record.clone());
        }
    }
}

/// Produce the three disjoint registry groups.
///
/// Records are merged by tab key, newest revision (then `updatedAt`) wins.
/// This device's live open tabs are authoritative: an open record for this
/// device that isn't live locally is stale and dropped, and a live tab always
/// shows its local record.
pub fn reconcile(input: &ReconcileInput<'_>) -> RegistryGroups {
    let mut merged: HashMap<String, RegistryTabRecord> = HashMap::new();

    if let Some(remote) = input.remote {
        for record in remote.iter() {
            merge_into(&mut merged, record, false);
        }
    }
    for record in input.local_closed {
        merge_into(&mut merged, record, true);
    }

    let live: HashSet<&str> = input.local_open.iter().map(|r| r.tab_key.as_str()).collect();
    merged.retain(|key, record| {
        if live.contains(key.as_str()) {
            return false;
        }
        let ours = record.device_id == input.device_id || is_device_tab(key, input.device_id);
        let stale_local = ours && record.is_open();
        if stale_local {
            log::debug!("Dropping stale local open record {}", key);
        }
        !stale_local
    });

    let cutoff = input.now - i64::from(input.range_days) * DAY_MS;
    let mut groups = RegistryGroups {
        local_open: input.local_open.to_vec(),
        ..Default::default()
    };
    for (_, record) in merged {
        if record.is_open() {
            groups.remote_open.push(record);
        } else if record.closed_sort_key() >= cutoff {
            groups.closed.push(record);
        }
    }

    groups.remote_open.sort_by(|a, b| {
        a.device_label
            .cmp(&b.device_label)
            .then(b.updated_at.cmp(&a.updated_at))
            .then(a.tab_key.cmp(&b.tab_key))
    });
    groups.closed.sort_by(|a, b| {
        b.closed_sort_key()
            .cmp(&a.closed_sort_key())
            .then(a.tab_key.cmp(&b.tab_key))
    });
    groups
}
