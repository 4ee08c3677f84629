//! Commit manifest
//!
//! The only way to obtain the part list for a completion request is through
//! [`CommitManifest::new`], which sorts the acknowledgements and rejects any
//! list that is not exactly `1..=total_parts` with non-empty tags.

use super::{CompletedPart, PartAck};
use crate::error::{Error, Result};

/// Validated, ascending list of parts for a completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitManifest {
    parts: Vec<CompletedPart>,
}

impl CommitManifest {
    pub fn new(mut acks: Vec<PartAck>, total_parts: usize) -> Result<Self> {
        acks.sort_by_key(|ack| ack.part_number);

        if acks.len() != total_parts {
            return Err(Error::General(format!(
                "commit manifest has {} parts, expected {total_parts}",
                acks.len()
            )));
        }

        for (index, ack) in acks.iter().enumerate() {
            let expected = index as u32 + 1;
            if ack.part_number != expected {
                return Err(Error::General(format!(
                    "commit manifest is not contiguous: found part {} where part {expected} belongs",
                    ack.part_number
                )));
            }
            if ack.integrity_tag.is_empty() {
                return Err(Error::General(format!(
                    "commit manifest part {expected} has no integrity tag"
                )));
            }
        }

        Ok(Self { parts: acks })
    }

    pub fn parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(manifest: &CommitManifest) -> Vec<u32> {
        manifest.parts().iter().map(|p| p.part_number).collect()
    }

    #[test]
    fn test_sorts_any_permutation() {
        let orders = [[1, 2, 3, 4], [4, 3, 2, 1], [2, 4, 1, 3], [3, 1, 4, 2]];
        for order in orders {
            let acks = order
                .iter()
                .map(|n| PartAck::new(*n, format!("etag-{n}")))
                .collect();
            let manifest = CommitManifest::new(acks, 4).unwrap();
            assert_eq!(numbers(&manifest), vec![1, 2, 3, 4]);
            assert_eq!(manifest.parts()[2].integrity_tag, "etag-3");
        }
    }

    #[test]
    fn test_rejects_gap() {
        let acks = vec![PartAck::new(1, "a"), PartAck::new(3, "c")];
        assert!(CommitManifest::new(acks, 2).is_err());
    }

    #[test]
    fn test_rejects_duplicate() {
        let acks = vec![PartAck::new(1, "a"), PartAck::new(1, "a"), PartAck::new(2, "b")];
        assert!(CommitManifest::new(acks, 3).is_err());
    }

    #[test]
    fn test_rejects_wrong_count() {
        let acks = vec![PartAck::new(1, "a"), PartAck::new(2, "b")];
        assert!(CommitManifest::new(acks, 3).is_err());
    }

    #[test]
    fn test_rejects_empty_tag() {
        let acks = vec![PartAck::new(1, "a"), PartAck::new(2, "")];
        assert!(CommitManifest::new(acks, 2).is_err());
    }

    #[test]
    fn test_rejects_part_zero() {
        let acks = vec![PartAck::new(0, "a"), PartAck::new(1, "b")];
        assert!(CommitManifest::new(acks, 2).is_err());
    }
}
