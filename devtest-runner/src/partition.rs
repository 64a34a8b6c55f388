// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sharding a test run across several hosts.
//!
//! Partitioning applies to tests that have already passed the filters, in enumeration order, so
//! every host that sees the same test universe and filters computes disjoint shards.

use crate::errors::PartitionerBuilderParseError;
use devtest_metadata::TestIdentifier;
use std::{fmt, str::FromStr};
use xxhash_rust::xxh64::xxh64;

/// Describes how to split selected tests into shards. Parsed from `count:M/N` or `hash:M/N`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum PartitionerBuilder {
    /// Deal selected tests out round-robin: shard M gets the M-th, (M+N)-th, ... test.
    Count {
        /// The shard this is in, counting up from 1.
        shard: u64,

        /// The total number of shards.
        total_shards: u64,
    },

    /// Assign each test to a shard by hashing its `class#method` key.
    Hash {
        /// The shard this is in, counting up from 1.
        shard: u64,

        /// The total number of shards.
        total_shards: u64,
    },
}

impl PartitionerBuilder {
    /// Creates a fresh [`Partitioner`] for one pass over the test list.
    pub fn build(&self) -> Partitioner {
        match *self {
            PartitionerBuilder::Count {
                shard,
                total_shards,
            } => Partitioner::Count {
                shard_minus_one: shard - 1,
                total_shards,
                curr: 0,
            },
            PartitionerBuilder::Hash {
                shard,
                total_shards,
            } => Partitioner::Hash {
                shard_minus_one: shard - 1,
                total_shards,
            },
        }
    }
}

impl fmt::Display for PartitionerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionerBuilder::Count {
                shard,
                total_shards,
            } => write!(f, "count:{shard}/{total_shards}"),
            PartitionerBuilder::Hash {
                shard,
                total_shards,
            } => write!(f, "hash:{shard}/{total_shards}"),
        }
    }
}

impl FromStr for PartitionerBuilder {
    type Err = PartitionerBuilderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(input) = s.strip_prefix("hash:") {
            let (shard, total_shards) = parse_shards(input, "hash:M/N")?;
            Ok(PartitionerBuilder::Hash {
                shard,
                total_shards,
            })
        } else if let Some(input) = s.strip_prefix("count:") {
            let (shard, total_shards) = parse_shards(input, "count:M/N")?;
            Ok(PartitionerBuilder::Count {
                shard,
                total_shards,
            })
        } else {
            Err(PartitionerBuilderParseError::new(
                None,
                format!("partition input '{s}' must begin with \"hash:\" or \"count:\""),
            ))
        }
    }
}

fn parse_shards(
    input: &str,
    expected_format: &'static str,
) -> Result<(u64, u64), PartitionerBuilderParseError> {
    let (shard_str, total_shards_str) = input.split_once('/').ok_or_else(|| {
        PartitionerBuilderParseError::new(
            Some(expected_format),
            format!("expected input '{input}' to be in the format M/N"),
        )
    })?;

    let parse = |name: &str, value: &str| {
        value.parse::<u64>().map_err(|err| {
            PartitionerBuilderParseError::new(
                Some(expected_format),
                format!("failed to parse {name} '{value}' as u64: {err}"),
            )
        })
    };
    let shard = parse("shard", shard_str)?;
    let total_shards = parse("total_shards", total_shards_str)?;

    if !(1..=total_shards).contains(&shard) {
        return Err(PartitionerBuilderParseError::new(
            Some(expected_format),
            format!(
                "shard {shard} must be a number between 1 and total shards {total_shards}, inclusive"
            ),
        ));
    }

    Ok((shard, total_shards))
}

/// Decides shard membership for tests, in enumeration order.
#[derive(Clone, Debug)]
pub enum Partitioner {
    /// Stateful round-robin partitioner.
    Count {
        /// Zero-based shard index.
        shard_minus_one: u64,
        /// The total number of shards.
        total_shards: u64,
        /// Position of the next test within the current round.
        curr: u64,
    },

    /// Stateless hash partitioner.
    Hash {
        /// Zero-based shard index.
        shard_minus_one: u64,
        /// The total number of shards.
        total_shards: u64,
    },
}

impl Partitioner {
    /// Returns true if `test` is in this shard.
    ///
    /// Must be called once for every selected test, in order.
    pub fn test_matches(&mut self, test: &TestIdentifier) -> bool {
        match self {
            Partitioner::Count {
                shard_minus_one,
                total_shards,
                curr,
            } => {
                let matches = *curr == *shard_minus_one;
                *curr = (*curr + 1) % *total_shards;
                matches
            }
            Partitioner::Hash {
                shard_minus_one,
                total_shards,
            } => {
                // The hash is over the `class#method` key so that shards are stable across hosts
                // and releases.
                xxh64(test.method_key().as_bytes(), 0) % *total_shards == *shard_minus_one
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("hash:1/2", PartitionerBuilder::Hash { shard: 1, total_shards: 2 }; "hash")]
    #[test_case("hash:1/1", PartitionerBuilder::Hash { shard: 1, total_shards: 1 }; "hash single")]
    #[test_case("count:3/3", PartitionerBuilder::Count { shard: 3, total_shards: 3 }; "count")]
    fn parse_success(input: &str, expected: PartitionerBuilder) {
        let builder: PartitionerBuilder = input.parse().expect("valid partition");
        assert_eq!(builder, expected);
        assert_eq!(builder.to_string(), input);
    }

    #[test_case("foo"; "no prefix")]
    #[test_case("hash:"; "missing shards")]
    #[test_case("hash:1"; "missing total")]
    #[test_case("hash:0/2"; "zero shard")]
    #[test_case("count:3/2"; "shard past total")]
    #[test_case("count:x/2"; "non-numeric shard")]
    #[test_case("count:1/-2"; "negative total")]
    fn parse_failure(input: &str) {
        input
            .parse::<PartitionerBuilder>()
            .expect_err("invalid partition");
    }

    fn tests(n: usize) -> Vec<TestIdentifier> {
        (0..n)
            .map(|i| TestIdentifier::new("com.x.ClassA", format!("test{i}")))
            .collect()
    }

    #[test]
    fn count_is_round_robin() {
        let all = tests(7);
        let mut partitioner = PartitionerBuilder::Count {
            shard: 2,
            total_shards: 3,
        }
        .build();
        let selected: Vec<_> = all
            .iter()
            .filter(|test| partitioner.test_matches(test))
            .map(|test| test.method_name().to_owned())
            .collect();
        assert_eq!(selected, vec!["test1", "test4"]);
    }

    #[test]
    fn shards_are_disjoint_and_complete() {
        let all = tests(50);
        for kind in ["count", "hash"] {
            let mut seen = vec![0usize; all.len()];
            for shard in 1..=4 {
                let builder: PartitionerBuilder = format!("{kind}:{shard}/4").parse().unwrap();
                let mut partitioner = builder.build();
                for (i, test) in all.iter().enumerate() {
                    if partitioner.test_matches(test) {
                        seen[i] += 1;
                    }
                }
            }
            assert!(seen.iter().all(|&count| count == 1), "{seen:?}");
        }
    }
}
