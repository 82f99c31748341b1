//! Line-level diff engine backing dry-run previews.
//!
//! The hunk format is part of the wire contract: 1-based line numbers,
//! disjoint hunks ordered by `start_old`, runs of consecutive changes
//! coalesced, and at most [`MAX_HUNK_LINES`] lines per side in one hunk.

use serde::{Deserialize, Serialize};

/// Cap on `lines_old` / `lines_new` within a single hunk.
pub const MAX_HUNK_LINES: usize = 100;
/// How far a single cursor may advance to find a resynchronization window.
const LOOKAHEAD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub start_old: usize,
    pub len_old: usize,
    pub start_new: usize,
    pub len_new: usize,
    pub lines_old: Vec<String>,
    pub lines_new: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub hunks: Vec<Hunk>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }
}

/// True when the cursors sit on a resynchronization point: both streams
/// exhausted, or a window of two equal lines (one equal line suffices when
/// both streams end right after it).
fn synced(o: &[&str], n: &[&str], i: usize, j: usize) -> bool {
    if i >= o.len() && j >= n.len() {
        return true;
    }
    if i >= o.len() || j >= n.len() {
        return false;
    }
    if o[i] != n[j] {
        return false;
    }
    match (o.get(i + 1), n.get(j + 1)) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Compute the hunk set transforming `old` into `new`.
pub fn compute(old: &str, new: &str) -> Diff {
    let o: Vec<&str> = old.split('\n').collect();
    let n: Vec<&str> = new.split('\n').collect();
    let mut hunks = Vec::new();
    let mut i = 0usize;
    let mut j = 0usize;

    while i < o.len() || j < n.len() {
        if i < o.len() && j < n.len() && o[i] == n[j] {
            i += 1;
            j += 1;
            continue;
        }

        let start_old = i + 1;
        let start_new = j + 1;
        let mut lines_old: Vec<String> = Vec::new();
        let mut lines_new: Vec<String> = Vec::new();

        loop {
            if synced(&o, &n, i, j) {
                break;
            }
            if lines_old.len() >= MAX_HUNK_LINES || lines_new.len() >= MAX_HUNK_LINES {
                break;
            }

            // Can one cursor alone reach a sync point within the look-ahead?
            let mut resynced = false;
            for k in 1..=LOOKAHEAD {
                if i + k <= o.len() && synced(&o, &n, i + k, j) {
                    for _ in 0..k {
                        lines_old.push(o[i].to_string());
                        i += 1;
                    }
                    resynced = true;
                    break;
                }
                if j + k <= n.len() && synced(&o, &n, i, j + k) {
                    for _ in 0..k {
                        lines_new.push(n[j].to_string());
                        j += 1;
                    }
                    resynced = true;
                    break;
                }
            }
            if resynced {
                break;
            }

            if i < o.len() {
                lines_old.push(o[i].to_string());
                i += 1;
            }
            if j < n.len() {
                lines_new.push(n[j].to_string());
                j += 1;
            }
        }

        hunks.push(Hunk {
            start_old,
            len_old: lines_old.len(),
            start_new,
            len_new: lines_new.len(),
            lines_old,
            lines_new,
        });
    }

    Diff { hunks }
}

/// Replay a hunk set over `old`.
pub fn apply(old: &str, diff: &Diff) -> String {
    let o: Vec<&str> = old.split('\n').collect();
    let mut out: Vec<&str> = Vec::new();
    let mut idx = 0usize;

    for hunk in &diff.hunks {
        let copy_until = hunk.start_old.saturating_sub(1);
        while idx < copy_until && idx < o.len() {
            out.push(o[idx]);
            idx += 1;
        }
        idx += hunk.len_old;
        out.extend(hunk.lines_new.iter().map(String::as_str));
    }
    while idx < o.len() {
        out.push(o[idx]);
        idx += 1;
    }

    out.join("\n")
}
