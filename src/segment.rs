//! Minimum-cost partitioning of a sorted entry sequence into runs.
//!
//! The positions `0..=len` of a sorted mapping form the nodes of an implicit
//! DAG. An edge from `v` to `w` is a candidate run covering entries
//! `[v, w)` with a particular encoding mode and a nonnegative serialized
//! cost. Since every edge moves forward, a single relaxation pass over the
//! nodes in increasing order yields the cheapest path from `0` to `len`,
//! i.e. the cheapest partition. Edges are generated lazily per node, so no
//! adjacency structure is ever materialized.

use crate::error::WriteError;

/// A run of entries `[start, end)` sharing one encoding mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Run<M> {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub mode: M,
}

/// A candidate run starting at the node currently being expanded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Candidate<M> {
    /// Exclusive end position; must be greater than the start node.
    pub end: usize,
    /// Serialized cost in format-specific units (words or tokens).
    pub cost: u64,
    pub mode: M,
}

/// Compute the cheapest partition of `[0, len)` into runs.
///
/// `candidates` is invoked once per reachable node with a cleared scratch
/// buffer and must push every admissible run starting there. It must push at
/// least one candidate per node, otherwise the end node can become
/// unreachable and an error is returned.
///
/// When two partitions tie on total cost the one whose edges were relaxed
/// first is kept. The tie-break is stable but carries no format meaning.
pub fn min_cost_partition<M, F>(len: usize, mut candidates: F) -> Result<Vec<Run<M>>, WriteError>
where
    M: Copy,
    F: FnMut(usize, &mut Vec<Candidate<M>>),
{
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut cost = vec![u64::MAX; len + 1];
    let mut pred: Vec<Option<(usize, M)>> = vec![None; len + 1];
    cost[0] = 0;

    let mut edges = Vec::new();
    for node in 0..len {
        if cost[node] == u64::MAX {
            continue;
        }
        edges.clear();
        candidates(node, &mut edges);
        for edge in &edges {
            debug_assert!(node < edge.end && edge.end <= len);
            let total = cost[node].saturating_add(edge.cost);
            if total < cost[edge.end] {
                cost[edge.end] = total;
                pred[edge.end] = Some((node, edge.mode));
            }
        }
    }

    let mut runs = Vec::new();
    let mut node = len;
    while node > 0 {
        let (start, mode) = pred[node].ok_or(WriteError::BadValue)?;
        runs.push(Run {
            start,
            end: node,
            mode,
        });
        node = start;
    }
    runs.reverse();
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit-step edges cost 3; an edge spanning the whole sequence costs 5.
    // The spanning edge must win for len > 1.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Mode {
        Step,
        Span,
    }

    #[test]
    fn test_prefers_cheap_long_edge() {
        let runs = min_cost_partition(4, |node, edges| {
            edges.push(Candidate {
                end: node + 1,
                cost: 3,
                mode: Mode::Step,
            });
            if node == 0 {
                edges.push(Candidate {
                    end: 4,
                    cost: 5,
                    mode: Mode::Span,
                });
            }
        })
        .unwrap();
        assert_eq!(
            runs,
            vec![Run {
                start: 0,
                end: 4,
                mode: Mode::Span
            }]
        );
    }

    #[test]
    fn test_mixes_edges() {
        // 0 -> 2 cheap, then steps
        let runs = min_cost_partition(3, |node, edges| {
            edges.push(Candidate {
                end: node + 1,
                cost: 2,
                mode: Mode::Step,
            });
            if node == 0 {
                edges.push(Candidate {
                    end: 2,
                    cost: 1,
                    mode: Mode::Span,
                });
            }
        })
        .unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].start, runs[0].end, runs[0].mode), (0, 2, Mode::Span));
        assert_eq!((runs[1].start, runs[1].end, runs[1].mode), (2, 3, Mode::Step));
    }

    #[test]
    fn test_partition_covers_everything() {
        let runs = min_cost_partition(7, |node, edges| {
            edges.push(Candidate {
                end: node + 1,
                cost: 1,
                mode: Mode::Step,
            });
            edges.push(Candidate {
                end: (node + 3).min(7),
                cost: 2,
                mode: Mode::Span,
            });
        })
        .unwrap();
        // contiguous, gap-free, overlap-free cover of [0, 7)
        let mut pos = 0;
        for run in &runs {
            assert_eq!(run.start, pos);
            assert!(run.end > run.start);
            pos = run.end;
        }
        assert_eq!(pos, 7);
    }

    #[test]
    fn test_empty_sequence() {
        let runs = min_cost_partition(0, |_node, edges: &mut Vec<Candidate<Mode>>| {
            edges.push(Candidate {
                end: 1,
                cost: 1,
                mode: Mode::Step,
            });
        })
        .unwrap();
        assert!(runs.is_empty());
    }

    #[test]
    fn test_unreachable_end_is_an_error() {
        // generator breaks its contract for node 1
        let result = min_cost_partition(2, |node, edges| {
            if node == 0 {
                edges.push(Candidate {
                    end: 1,
                    cost: 1,
                    mode: Mode::Step,
                });
            }
        });
        assert_eq!(result, Err(WriteError::BadValue));
    }
}
