//! Packet topic-spec resolution.
//!
//! A listen request names its packets with specs: an exact packet-type
//! name, a numeric packet id, `"all"`, or a `"!"`-prefixed exclusion
//! applied against whatever the other specs selected. A spec that matches
//! nothing in the known topic set is an error.

use std::collections::{BTreeMap, HashMap};

use crate::error::SessionError;

/// Resolves a list of topic specs into concrete packet-type names.
///
/// Specs are applied in order, so `["all", "!UpdateBlock"]` selects every
/// packet except `UpdateBlock`, while a later `"UpdateBlock"` would add it
/// back.
pub fn resolve_packet_targets(
    specs: &[&str],
    name_to_id: &HashMap<String, i64>,
    id_to_name: &HashMap<i64, String>,
) -> Result<Vec<String>, SessionError> {
    let mut wanted: BTreeMap<String, bool> = BTreeMap::new();

    for spec in specs {
        let mut hit = false;
        if *spec == "all" {
            for name in name_to_id.keys() {
                wanted.insert(name.clone(), true);
            }
            hit = true;
        } else if let Some(excluded) = spec.strip_prefix('!') {
            if let Some(name) = lookup(excluded, name_to_id, id_to_name) {
                wanted.insert(name, false);
                hit = true;
            }
        } else if let Some(name) = lookup(spec, name_to_id, id_to_name) {
            wanted.insert(name, true);
            hit = true;
        }
        if !hit {
            return Err(SessionError::InvalidTopic((*spec).to_string()));
        }
    }

    Ok(wanted
        .into_iter()
        .filter_map(|(name, keep)| keep.then_some(name))
        .collect())
}

fn lookup(
    spec: &str,
    name_to_id: &HashMap<String, i64>,
    id_to_name: &HashMap<i64, String>,
) -> Option<String> {
    if name_to_id.contains_key(spec) {
        return Some(spec.to_string());
    }
    spec.parse::<i64>()
        .ok()
        .and_then(|id| id_to_name.get(&id).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> (HashMap<String, i64>, HashMap<i64, String>) {
        let name_to_id: HashMap<String, i64> = [
            ("SetTime".to_string(), 10_i64),
            ("UpdateBlock".to_string(), 21),
            ("MoveActorDelta".to_string(), 111),
        ]
        .into_iter()
        .collect();
        let id_to_name = name_to_id
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect();
        (name_to_id, id_to_name)
    }

    #[test]
    fn test_exact_name() {
        let (names, ids) = mapping();
        let targets = resolve_packet_targets(&["SetTime"], &names, &ids).unwrap();
        assert_eq!(targets, vec!["SetTime"]);
    }

    #[test]
    fn test_numeric_id() {
        let (names, ids) = mapping();
        let targets = resolve_packet_targets(&["10"], &names, &ids).unwrap();
        assert_eq!(targets, vec!["SetTime"]);
    }

    #[test]
    fn test_all_with_exclusions() {
        let (names, ids) = mapping();
        let targets =
            resolve_packet_targets(&["all", "!UpdateBlock", "!111"], &names, &ids).unwrap();
        assert_eq!(targets, vec!["SetTime"]);
    }

    #[test]
    fn test_unmatched_spec_is_invalid_topic() {
        let (names, ids) = mapping();
        let err = resolve_packet_targets(&["NoSuchPacket"], &names, &ids).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTopic(spec) if spec == "NoSuchPacket"));

        let err = resolve_packet_targets(&["!999"], &names, &ids).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTopic(spec) if spec == "!999"));
    }

    #[test]
    fn test_mixed_specs() {
        let (names, ids) = mapping();
        let targets = resolve_packet_targets(&["SetTime", "21"], &names, &ids).unwrap();
        assert_eq!(targets, vec!["SetTime", "UpdateBlock"]);
    }
}
