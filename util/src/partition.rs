//! Size-bounded partitioning of feedback files.
//!
//! The platform rejects uploads over a fixed byte limit, so the returned
//! feedback is split into several archives. The policy is greedy
//! first-fit-by-arrival: walk the input once, close the running partition
//! whenever the next file would push it over the limit. The result depends
//! on input order, so callers sort their input when reproducibility across
//! runs matters. There is no lookahead and no best-fit reordering.

use log::warn;
use std::path::PathBuf;

/// Result of partitioning: each inner list sums to at most the limit;
/// oversize files end up in `skipped` and in no partition.
#[derive(Debug, Default, PartialEq)]
pub struct Partitions {
    pub partitions: Vec<Vec<PathBuf>>,
    pub skipped: Vec<PathBuf>,
}

pub fn partition(files: &[(PathBuf, u64)], limit_bytes: u64) -> Partitions {
    let mut result = Partitions::default();
    let mut current: Vec<PathBuf> = Vec::new();
    let mut current_size: u64 = 0;

    for (file, size) in files {
        if *size > limit_bytes {
            warn!(
                "file '{}' exceeds limit of {limit_bytes} bytes. File will be skipped.",
                file.display()
            );
            result.skipped.push(file.clone());
            continue;
        }

        if current_size + size <= limit_bytes {
            current.push(file.clone());
            current_size += size;
        } else {
            result.partitions.push(std::mem::take(&mut current));
            current.push(file.clone());
            current_size = *size;
        }
    }

    if !current.is_empty() {
        result.partitions.push(current);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(sizes: &[u64]) -> Vec<(PathBuf, u64)> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, s)| (PathBuf::from(format!("f{i}")), *s))
            .collect()
    }

    fn names(partition: &[PathBuf]) -> Vec<&str> {
        partition.iter().map(|p| p.to_str().unwrap()).collect()
    }

    #[test]
    fn splits_when_the_limit_would_be_exceeded() {
        let result = partition(&files(&[10, 15, 8]), 20);
        assert_eq!(result.partitions.len(), 2);
        assert_eq!(names(&result.partitions[0]), ["f0"]);
        assert_eq!(names(&result.partitions[1]), ["f1", "f2"]);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn packs_greedily_under_a_larger_limit() {
        let result = partition(&files(&[10, 15, 8]), 25);
        assert_eq!(result.partitions.len(), 2);
        assert_eq!(names(&result.partitions[0]), ["f0", "f1"]);
        assert_eq!(names(&result.partitions[1]), ["f2"]);
    }

    #[test]
    fn oversize_files_are_skipped_entirely() {
        let result = partition(&files(&[30, 5, 5]), 20);
        assert_eq!(result.skipped, vec![PathBuf::from("f0")]);
        assert_eq!(result.partitions.len(), 1);
        assert_eq!(names(&result.partitions[0]), ["f1", "f2"]);
    }

    #[test]
    fn every_partition_stays_under_the_limit() {
        let input = files(&[7, 7, 7, 7, 7, 7, 7]);
        let result = partition(&input, 20);
        for p in &result.partitions {
            let total: u64 = p
                .iter()
                .map(|f| input.iter().find(|(path, _)| path == f).unwrap().1)
                .sum();
            assert!(total <= 20);
        }
        let placed: usize = result.partitions.iter().map(|p| p.len()).sum();
        assert_eq!(placed, input.len());
    }

    #[test]
    fn empty_input_yields_no_partitions() {
        let result = partition(&[], 20);
        assert!(result.partitions.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn a_file_exactly_at_the_limit_is_placed_alone() {
        let result = partition(&files(&[20, 1]), 20);
        assert_eq!(result.partitions.len(), 2);
        assert_eq!(names(&result.partitions[0]), ["f0"]);
    }
}
