//! Unified diff rendering of patches.
//!
//! Text chunks are grouped into hunks with surrounding context lines, in the
//! same shape `diff -u` and git print them.

use std::fmt::Write;

use strata_types::ObjectId;

use crate::change::Action;
use crate::engine::Operation;
use crate::patch::{Chunk, FileMeta, FilePatch, Patch, PatchContent};

/// Default number of context lines around a change.
pub const DEFAULT_CONTEXT: usize = 3;

/// A contiguous region of changes in a diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffHunk {
    /// Line number in the old content where this hunk starts (1-based, or the
    /// preceding line when `old_count` is zero).
    pub old_start: usize,
    /// Number of lines from the old content in this hunk.
    pub old_count: usize,
    /// Line number in the new content where this hunk starts.
    pub new_start: usize,
    /// Number of lines from the new content in this hunk.
    pub new_count: usize,
    /// The individual diff lines in this hunk.
    pub lines: Vec<DiffLine>,
}

/// A single line in a diff hunk, with its terminator if it had one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffLine {
    /// A line present in both old and new (context).
    Context(String),
    /// A line added in the new content.
    Added(String),
    /// A line removed from the old content.
    Removed(String),
}

impl DiffLine {
    fn raw(&self) -> &str {
        match self {
            Self::Context(s) | Self::Added(s) | Self::Removed(s) => s,
        }
    }

    /// Line content without its `\n`.
    pub fn text(&self) -> &str {
        self.raw().strip_suffix('\n').unwrap_or(self.raw())
    }

    fn prefix(&self) -> char {
        match self {
            Self::Context(_) => ' ',
            Self::Added(_) => '+',
            Self::Removed(_) => '-',
        }
    }
}

struct Positioned<'a> {
    op: Operation,
    line: &'a str,
    old: usize,
    new: usize,
}

fn flatten(chunks: &[Chunk]) -> Vec<Positioned<'_>> {
    chunks
        .iter()
        .flat_map(|chunk| {
            chunk.lines.iter().enumerate().map(move |(i, line)| {
                let (old, new) = match chunk.op {
                    Operation::Equal => (chunk.old_start + i, chunk.new_start + i),
                    Operation::Delete => (chunk.old_start + i, chunk.new_start),
                    Operation::Insert => (chunk.old_start, chunk.new_start + i),
                };
                Positioned {
                    op: chunk.op,
                    line,
                    old,
                    new,
                }
            })
        })
        .collect()
}

/// Group `chunks` into hunks with up to `context` unchanged lines around each
/// change. Changes separated by at most `2 * context` unchanged lines share a
/// hunk.
pub fn hunks(chunks: &[Chunk], context: usize) -> Vec<DiffHunk> {
    let lines = flatten(chunks);
    let changed: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.op != Operation::Equal)
        .map(|(i, _)| i)
        .collect();

    let mut hunks = Vec::new();
    let mut i = 0;
    while i < changed.len() {
        let first = changed[i];
        let mut last = first;
        i += 1;
        while i < changed.len() && changed[i] - last - 1 <= 2 * context {
            last = changed[i];
            i += 1;
        }
        let start = first.saturating_sub(context);
        let end = (last + context + 1).min(lines.len());
        hunks.push(make_hunk(&lines[start..end]));
    }
    hunks
}

fn make_hunk(lines: &[Positioned<'_>]) -> DiffHunk {
    let mut old_count = 0;
    let mut new_count = 0;
    let diff_lines = lines
        .iter()
        .map(|l| {
            let text = l.line.to_string();
            match l.op {
                Operation::Equal => {
                    old_count += 1;
                    new_count += 1;
                    DiffLine::Context(text)
                }
                Operation::Delete => {
                    old_count += 1;
                    DiffLine::Removed(text)
                }
                Operation::Insert => {
                    new_count += 1;
                    DiffLine::Added(text)
                }
            }
        })
        .collect();

    let (old_first, new_first) = lines.first().map_or((0, 0), |l| (l.old, l.new));
    let one_based = |first: usize, count: usize| if count == 0 { first } else { first + 1 };
    DiffHunk {
        old_start: one_based(old_first, old_count),
        old_count,
        new_start: one_based(new_first, new_count),
        new_count,
        lines: diff_lines,
    }
}

fn range(start: usize, count: usize) -> String {
    if count == 1 {
        start.to_string()
    } else {
        format!("{start},{count}")
    }
}

fn short_id(meta: Option<&FileMeta>) -> String {
    meta.map_or_else(|| ObjectId::zero().short_hex(), |m| m.id.short_hex())
}

fn side_name(meta: Option<&FileMeta>, prefix: &str) -> String {
    match meta {
        Some(m) => format!("{prefix}/{}", m.path),
        None => "/dev/null".to_string(),
    }
}

impl FilePatch {
    /// Render this record as a unified diff with `context` lines of context.
    pub fn to_unified(&self, context: usize) -> String {
        let from = self.from.as_ref();
        let to = self.to.as_ref();
        let mut out = String::new();

        let _ = writeln!(out, "diff --git a/{0} b/{0}", self.path);
        match (self.action, from, to) {
            (Action::Insert, _, Some(t)) => {
                let _ = writeln!(out, "new file mode {}", t.mode);
            }
            (Action::Delete, Some(f), _) => {
                let _ = writeln!(out, "deleted file mode {}", f.mode);
            }
            (Action::Modify, Some(f), Some(t)) if f.mode != t.mode => {
                let _ = writeln!(out, "old mode {}\nnew mode {}", f.mode, t.mode);
            }
            _ => {}
        }
        let _ = writeln!(out, "index {}..{}", short_id(from), short_id(to));

        let (a, b) = (side_name(from, "a"), side_name(to, "b"));
        match &self.content {
            PatchContent::Structural => {}
            PatchContent::Binary => {
                let _ = writeln!(out, "Binary files {a} and {b} differ");
            }
            PatchContent::LineLimitExceeded => {
                let _ = writeln!(out, "Too many distinct lines to diff {a} and {b}");
            }
            PatchContent::Text(chunks) => {
                let hunks = hunks(chunks, context);
                if hunks.is_empty() {
                    return out;
                }
                let _ = writeln!(out, "--- {a}\n+++ {b}");
                for hunk in &hunks {
                    let _ = writeln!(
                        out,
                        "@@ -{} +{} @@",
                        range(hunk.old_start, hunk.old_count),
                        range(hunk.new_start, hunk.new_count)
                    );
                    for line in &hunk.lines {
                        out.push(line.prefix());
                        out.push_str(line.text());
                        out.push('\n');
                        if !line.raw().ends_with('\n') {
                            out.push_str("\\ No newline at end of file\n");
                        }
                    }
                }
            }
        }
        out
    }
}

impl Patch {
    /// Render every record as a unified diff, in order.
    pub fn to_unified(&self, context: usize) -> String {
        self.files.iter().map(|f| f.to_unified(context)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store::EntryMode;

    fn chunk(op: Operation, lines: &[&str], old_start: usize, new_start: usize) -> Chunk {
        Chunk {
            op,
            lines: lines.iter().map(|l| l.to_string()).collect(),
            old_start,
            new_start,
        }
    }

    fn meta(path: &str, mode: EntryMode, data: &[u8]) -> FileMeta {
        FileMeta {
            path: path.to_string(),
            mode,
            id: ObjectId::digest(data),
            size: data.len() as u64,
        }
    }

    #[test]
    fn no_changes_no_hunks() {
        let chunks = vec![chunk(Operation::Equal, &["a\n", "b\n"], 0, 0)];
        assert!(hunks(&chunks, 3).is_empty());
    }

    #[test]
    fn hunk_includes_context() {
        let equal: Vec<String> = (1..=10).map(|i| format!("{i}\n")).collect();
        let equal: Vec<&str> = equal.iter().map(String::as_str).collect();
        let chunks = vec![
            chunk(Operation::Equal, &equal[..5], 0, 0),
            chunk(Operation::Delete, &["x\n"], 5, 5),
            chunk(Operation::Insert, &["y\n"], 6, 5),
            chunk(Operation::Equal, &equal[5..], 6, 6),
        ];
        let hunks = hunks(&chunks, 3);
        assert_eq!(hunks.len(), 1);
        let h = &hunks[0];
        assert_eq!((h.old_start, h.old_count, h.new_start, h.new_count), (3, 7, 3, 7));
        assert_eq!(h.lines[0], DiffLine::Context("3\n".into()));
        assert_eq!(h.lines[3].text(), "x");
    }

    #[test]
    fn distant_changes_split_into_hunks() {
        let equal: Vec<String> = (0..20).map(|i| format!("{i}\n")).collect();
        let equal: Vec<&str> = equal.iter().map(String::as_str).collect();
        let chunks = vec![
            chunk(Operation::Insert, &["head\n"], 0, 0),
            chunk(Operation::Equal, &equal, 0, 1),
            chunk(Operation::Insert, &["tail\n"], 20, 21),
        ];
        let hunks = hunks(&chunks, 2);
        assert_eq!(hunks.len(), 2);
        assert_eq!((hunks[0].old_start, hunks[0].old_count), (1, 2));
        assert_eq!((hunks[0].new_start, hunks[0].new_count), (1, 3));
        assert_eq!((hunks[1].old_start, hunks[1].old_count), (19, 2));
        assert_eq!((hunks[1].new_start, hunks[1].new_count), (20, 3));
    }

    #[test]
    fn pure_insert_into_empty_file_starts_at_zero() {
        let chunks = vec![chunk(Operation::Insert, &["a\n"], 0, 0)];
        let h = &hunks(&chunks, 3)[0];
        assert_eq!((h.old_start, h.old_count, h.new_start, h.new_count), (0, 0, 1, 1));
    }

    #[test]
    fn renders_modified_text() {
        let chunks = vec![
            chunk(Operation::Equal, &["a\n"], 0, 0),
            chunk(Operation::Delete, &["b\n"], 1, 1),
            chunk(Operation::Insert, &["c"], 2, 1),
        ];
        let file = FilePatch {
            path: "f.txt".into(),
            action: Action::Modify,
            from: Some(meta("f.txt", EntryMode::Regular, b"a\nb\n")),
            to: Some(meta("f.txt", EntryMode::Regular, b"a\nc")),
            content: PatchContent::Text(chunks),
        };
        let text = file.to_unified(DEFAULT_CONTEXT);
        let expected = format!(
            "diff --git a/f.txt b/f.txt\n\
             index {}..{}\n\
             --- a/f.txt\n\
             +++ b/f.txt\n\
             @@ -1,2 +1,2 @@\n \
             a\n\
             -b\n\
             +c\n\
             \\ No newline at end of file\n",
            ObjectId::digest(b"a\nb\n").short_hex(),
            ObjectId::digest(b"a\nc").short_hex(),
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn renders_binary_insert() {
        let file = FilePatch {
            path: "img.png".into(),
            action: Action::Insert,
            from: None,
            to: Some(meta("img.png", EntryMode::Regular, b"\0png")),
            content: PatchContent::Binary,
        };
        let text = file.to_unified(DEFAULT_CONTEXT);
        assert!(text.contains("new file mode 100644\n"));
        assert!(text.contains("index 00000000.."));
        assert!(text.ends_with("Binary files /dev/null and b/img.png differ\n"));
    }

    #[test]
    fn renders_mode_change() {
        let file = FilePatch {
            path: "run.sh".into(),
            action: Action::Modify,
            from: Some(meta("run.sh", EntryMode::Regular, b"x\n")),
            to: Some(meta("run.sh", EntryMode::Executable, b"x\n")),
            content: PatchContent::Text(vec![chunk(Operation::Equal, &["x\n"], 0, 0)]),
        };
        let text = file.to_unified(DEFAULT_CONTEXT);
        assert!(text.contains("old mode 100644\nnew mode 100755\n"));
        assert!(!text.contains("---"));
    }
}
