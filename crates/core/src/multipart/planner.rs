//! Part planning
//!
//! An empty file plans to a single zero-length part, so every upload has at
//! least one part to commit.

use super::PartRange;
use crate::error::{Error, Result};

/// Largest part count S3-compatible services accept in one session
pub const MAX_PARTS: u64 = 10_000;

/// Split `file_size` bytes into ranges of `part_size` (the last may be shorter)
pub fn plan(file_size: u64, part_size: u64) -> Result<Vec<PartRange>> {
    if part_size == 0 {
        return Err(Error::InvalidArgument(
            "part size must be greater than zero".to_string(),
        ));
    }

    if file_size == 0 {
        return Ok(vec![PartRange {
            part_number: 1,
            offset: 0,
            length: 0,
        }]);
    }

    let total_parts = file_size.div_ceil(part_size);
    if total_parts > MAX_PARTS {
        return Err(Error::InvalidArgument(format!(
            "{file_size} bytes with {part_size}-byte parts needs {total_parts} parts (max {MAX_PARTS})"
        )));
    }

    let ranges = (0..total_parts)
        .map(|i| {
            let offset = i * part_size;
            PartRange {
                part_number: (i + 1) as u32,
                offset,
                length: part_size.min(file_size - offset),
            }
        })
        .collect();

    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn assert_well_formed(ranges: &[PartRange], file_size: u64) {
        let total: u64 = ranges.iter().map(|r| r.length).sum();
        assert_eq!(total, file_size);

        let mut expected_offset = 0;
        for (i, range) in ranges.iter().enumerate() {
            assert_eq!(range.part_number, i as u32 + 1);
            assert_eq!(range.offset, expected_offset);
            expected_offset += range.length;
        }
    }

    #[test]
    fn test_twelve_mb_in_five_mb_parts() {
        let ranges = plan(12 * MB, 5 * MB).unwrap();
        assert_eq!(ranges.len(), 3);
        assert_eq!(
            ranges.iter().map(|r| r.length).collect::<Vec<_>>(),
            vec![5 * MB, 5 * MB, 2 * MB]
        );
        assert_eq!(ranges[2].offset, 10 * MB);
        assert_well_formed(&ranges, 12 * MB);
    }

    #[test]
    fn test_exact_multiple() {
        let ranges = plan(10 * MB, 5 * MB).unwrap();
        assert_eq!(ranges.len(), 2);
        assert!(ranges.iter().all(|r| r.length == 5 * MB));
    }

    #[test]
    fn test_smaller_than_one_part() {
        let ranges = plan(100, 5 * MB).unwrap();
        assert_eq!(
            ranges,
            vec![PartRange {
                part_number: 1,
                offset: 0,
                length: 100
            }]
        );
    }

    #[test]
    fn test_zero_length_file_is_one_empty_part() {
        let ranges = plan(0, 5 * MB).unwrap();
        assert_eq!(
            ranges,
            vec![PartRange {
                part_number: 1,
                offset: 0,
                length: 0
            }]
        );
    }

    #[test]
    fn test_zero_part_size_rejected() {
        assert!(matches!(plan(100, 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(plan(0, 0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_too_many_parts_rejected() {
        assert!(matches!(
            plan(MAX_PARTS + 1, 1),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(plan(MAX_PARTS, 1).unwrap().len(), MAX_PARTS as usize);
    }

    #[test]
    fn test_sizes_sum_and_numbers_are_contiguous() {
        for file_size in [1u64, 2, 7, 99, 100, 101, 1023, 4096, 65_537] {
            for part_size in [1, 3, 64, 100, 4096, 1 << 20] {
                if file_size.div_ceil(part_size) > MAX_PARTS {
                    continue;
                }
                let ranges = plan(file_size, part_size).unwrap();
                assert_eq!(ranges.len() as u64, file_size.div_ceil(part_size));
                assert_well_formed(&ranges, file_size);
            }
        }
    }

    #[test]
    fn test_plan_is_idempotent() {
        assert_eq!(plan(12 * MB, 5 * MB).unwrap(), plan(12 * MB, 5 * MB).unwrap());
        assert_eq!(plan(0, 1).unwrap(), plan(0, 1).unwrap());
    }
}
