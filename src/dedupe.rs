//! Duplicate detection over a record snapshot.
//!
//! Pipeline:
//! 1. Candidate pairs: every (i, j) with i < j, or, with blocking enabled,
//!    only pairs whose normalized titles share at least one token.
//! 2. Scoring: candidate pairs are scored in parallel. Each pair is produced
//!    by exactly one outer index, and results are collected in input order.
//! 3. Clustering: a single union-find pass over the collected edges.
//!
//! Blocking only prunes work; clustering depends solely on which edges meet
//! the threshold, so the outcome does not depend on thread scheduling.

use log::debug;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::UnifyConfig;
use crate::models::{DuplicateCandidate, DuplicateCluster, Matchable};
use crate::scoring::{score_pair, title_tokens};

// ============================================================================
// Union-Find
// ============================================================================

/// Disjoint sets over record indices with path halving and union by rank.
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    /// Components in order of their smallest member, members ascending.
    pub fn into_clusters(mut self) -> Vec<DuplicateCluster> {
        let mut slot_of_root: FxHashMap<usize, usize> = FxHashMap::default();
        let mut clusters: Vec<DuplicateCluster> = Vec::new();

        for idx in 0..self.parent.len() {
            let root = self.find(idx);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                clusters.push(DuplicateCluster { members: Vec::new() });
                clusters.len() - 1
            });
            clusters[slot].members.push(idx);
        }
        clusters
    }
}

// ============================================================================
// Candidate Generation
// ============================================================================

/// Partner indices j > i worth scoring against record i.
enum PairSource {
    All(usize),
    Blocked {
        tokens: Vec<Vec<String>>,
        postings: FxHashMap<String, Vec<usize>>,
    },
}

impl PairSource {
    fn new<R: Matchable>(records: &[R], blocking: bool) -> Self {
        if !blocking {
            return PairSource::All(records.len());
        }

        let tokens: Vec<Vec<String>> = records.iter().map(|r| title_tokens(r.title())).collect();
        let mut postings: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (idx, toks) in tokens.iter().enumerate() {
            for tok in toks {
                postings.entry(tok.clone()).or_default().push(idx);
            }
        }
        PairSource::Blocked { tokens, postings }
    }

    fn partners(&self, i: usize) -> Vec<usize> {
        match self {
            PairSource::All(len) => (i + 1..*len).collect(),
            PairSource::Blocked { tokens, postings } => {
                let mut partners: Vec<usize> = tokens[i]
                    .iter()
                    .filter_map(|tok| postings.get(tok))
                    .flat_map(|list| list.iter().copied().filter(|&j| j > i))
                    .collect();
                partners.sort_unstable();
                partners.dedup();
                partners
            }
        }
    }
}

/// Score all candidate pairs and return those at or above the threshold,
/// ordered by (left, right).
pub fn find_candidates<R: Matchable + Sync>(
    records: &[R],
    config: &UnifyConfig,
) -> Vec<DuplicateCandidate> {
    let source = PairSource::new(records, config.blocking);
    let threshold = config.similarity_threshold;

    (0..records.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            source
                .partners(i)
                .into_iter()
                .filter_map(|j| {
                    let score = score_pair(&records[i], &records[j], config);
                    (score.combined >= threshold).then_some(DuplicateCandidate {
                        left: i,
                        right: j,
                        score: score.combined,
                        strategy: score.strategy,
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

// ============================================================================
// Clustering
// ============================================================================

/// Partition `records` into duplicate clusters.
///
/// Every index appears in exactly one cluster; records without a qualifying
/// edge form singletons. Clusters are ordered by their first member.
pub fn find_duplicates<R: Matchable + Sync>(
    records: &[R],
    config: &UnifyConfig,
) -> Vec<DuplicateCluster> {
    let candidates = find_candidates(records, config);

    let mut sets = DisjointSet::new(records.len());
    for cand in &candidates {
        sets.union(cand.left, cand.right);
    }
    let clusters = sets.into_clusters();

    debug!(
        "Scored {} records: {} edges, {} clusters ({} with duplicates)",
        records.len(),
        candidates.len(),
        clusters.len(),
        clusters.iter().filter(|c| !c.is_singleton()).count()
    );
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchStrategy;

    #[derive(Clone)]
    struct Rec(String, String);

    impl Matchable for Rec {
        fn title(&self) -> &str {
            &self.0
        }
        fn artist(&self) -> &str {
            &self.1
        }
    }

    fn recs(items: &[(&str, &str)]) -> Vec<Rec> {
        items.iter().map(|(t, a)| Rec(t.to_string(), a.to_string())).collect()
    }

    fn members(clusters: &[DuplicateCluster]) -> Vec<Vec<usize>> {
        clusters.iter().map(|c| c.members.clone()).collect()
    }

    fn sample() -> Vec<Rec> {
        recs(&[
            ("Song Title", "Artist"),
            ("Another Song", "Someone"),
            ("Song Title", "Artist"),
            ("Song Titles", "Artist"),
            ("Completely Different", "Band"),
            ("Another Song", "Someone Else Entirely"),
            ("Song Title", "Artist feat. Guest"),
        ])
    }

    #[test]
    fn test_disjoint_set() {
        let mut sets = DisjointSet::new(5);
        sets.union(0, 3);
        sets.union(3, 4);
        assert_eq!(sets.find(0), sets.find(4));
        assert_ne!(sets.find(0), sets.find(1));
        assert_eq!(members(&sets.into_clusters()), vec![vec![0, 3, 4], vec![1], vec![2]]);
    }

    #[test]
    fn test_exact_duplicates_cluster() {
        let records = recs(&[("Song Title", "Artist"), ("Other", "X"), ("song title", "artist")]);
        let clusters = find_duplicates(&records, &UnifyConfig::default());
        assert_eq!(members(&clusters), vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_partition_invariant() {
        let records = sample();
        for blocking in [true, false] {
            let config = UnifyConfig {
                blocking,
                ..Default::default()
            };
            let clusters = find_duplicates(&records, &config);
            let mut seen: Vec<usize> = clusters.iter().flat_map(|c| c.members.clone()).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..records.len()).collect::<Vec<_>>());
            assert!(clusters.iter().all(|c| !c.is_empty()));
        }
    }

    #[test]
    fn test_transitive_clustering() {
        // 0~1 and 1~2 qualify, 0~2 alone would not
        let records = recs(&[
            ("abcdefghij", "Artist"),
            ("abcdefghijkl", "Artist"),
            ("abcdefghijklmn", "Artist"),
        ]);
        let config = UnifyConfig {
            similarity_threshold: 0.92,
            blocking: false,
            ..Default::default()
        };
        let direct = score_pair(&records[0], &records[2], &config).combined;
        assert!(direct < 0.92);
        let clusters = find_duplicates(&records, &config);
        assert_eq!(members(&clusters), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_blocking_skips_disjoint_titles() {
        // No shared token: never scored with blocking, merged without
        let records = recs(&[("Helo", "Adele"), ("Hello", "Adele")]);
        let blocked = find_candidates(&records, &UnifyConfig::default());
        assert!(blocked.is_empty());

        let full = find_candidates(
            &records,
            &UnifyConfig {
                blocking: false,
                ..Default::default()
            },
        );
        assert_eq!(full.len(), 1);
        assert_eq!((full[0].left, full[0].right), (0, 1));
        assert_eq!(full[0].strategy, MatchStrategy::TitleAndArtist);
    }

    #[test]
    fn test_blocking_matches_full_comparison() {
        let records = sample();
        let blocked = find_duplicates(&records, &UnifyConfig::default());
        let full = find_duplicates(
            &records,
            &UnifyConfig {
                blocking: false,
                ..Default::default()
            },
        );
        assert_eq!(blocked, full);
    }

    #[test]
    fn test_candidates_ordered_and_above_threshold() {
        let config = UnifyConfig::default();
        let candidates = find_candidates(&sample(), &config);
        assert!(!candidates.is_empty());
        for pair in candidates.windows(2) {
            assert!((pair[0].left, pair[0].right) < (pair[1].left, pair[1].right));
        }
        for cand in &candidates {
            assert!(cand.left < cand.right);
            assert!(cand.score >= config.similarity_threshold);
        }
    }

    #[test]
    fn test_all_sharing_a_token_degrades_to_full() {
        let records = recs(&[("love a", "x"), ("love b", "y"), ("love c", "z"), ("love d", "w")]);
        let source = PairSource::new(&records, true);
        let pairs: usize = (0..records.len()).map(|i| source.partners(i).len()).sum();
        assert_eq!(pairs, 6);
    }

    #[test]
    fn test_empty_and_single_input() {
        let config = UnifyConfig::default();
        assert!(find_duplicates::<Rec>(&[], &config).is_empty());
        let one = recs(&[("Solo", "Artist")]);
        assert_eq!(members(&find_duplicates(&one, &config)), vec![vec![0]]);
    }
}
