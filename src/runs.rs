// SPDX-License-Identifier: MIT
//! Style run normalization
//!
//! Before persisting, every text block's runs are rewritten into a covering
//! set: sorted, non-overlapping, adjacent equal attributes merged, and every
//! unstyled byte assigned [`StyleAttr::default()`].

use crate::model::{StyleAttr, StyleRun};

/// Rewrite `runs` into the gap-filled, coalesced covering set for a text of `text_len` bytes
///
/// Runs are clipped to the text. Where runs overlap, the one that sorts first
/// by `(start, end)` keeps the contested bytes. An empty text always yields a
/// single `[0, 0)` run carrying the first supplied attribute, or the default.
pub fn covering_runs(text_len: usize, runs: &[StyleRun]) -> Vec<StyleRun> {
    let len = u32::try_from(text_len).unwrap_or(u32::MAX);

    if len == 0 {
        let attr = runs.first().map(|r| r.attr).unwrap_or_default();
        return vec![StyleRun::new(0, 0, attr)];
    }

    let mut clipped: Vec<StyleRun> = runs
        .iter()
        .filter_map(|r| {
            let (start, end) = if r.start <= r.end {
                (r.start, r.end)
            } else {
                (r.end, r.start)
            };
            let (start, end) = (start.min(len), end.min(len));
            (start < end).then(|| StyleRun::new(start, end, r.attr))
        })
        .collect();
    clipped.sort_by_key(|r| (r.start, r.end));

    let mut out: Vec<StyleRun> = Vec::with_capacity(clipped.len() * 2 + 1);
    let mut cursor = 0u32;
    for mut run in clipped {
        if run.end <= cursor {
            continue;
        }
        run.start = run.start.max(cursor);
        if run.start > cursor {
            push_merged(&mut out, StyleRun::new(cursor, run.start, StyleAttr::default()));
        }
        cursor = run.end;
        push_merged(&mut out, run);
    }
    if cursor < len {
        push_merged(&mut out, StyleRun::new(cursor, len, StyleAttr::default()));
    }

    out
}

fn push_merged(out: &mut Vec<StyleRun>, run: StyleRun) {
    if let Some(last) = out.last_mut() {
        if last.end == run.start && last.attr == run.attr {
            last.end = run.end;
            return;
        }
    }
    out.push(run);
}

/// Per-byte attribute map of a text block, for comparing effective styling
///
/// Two run lists with equal effective styles render identically even when
/// their run boundaries differ.
pub fn effective_styles(text_len: usize, runs: &[StyleRun]) -> Vec<StyleAttr> {
    let mut out = Vec::with_capacity(text_len);
    for run in covering_runs(text_len, runs) {
        out.extend(std::iter::repeat_n(run.attr, run.len() as usize));
    }
    out
}
