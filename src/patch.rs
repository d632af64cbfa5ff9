// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::codehost::CommitFile;
use crate::errors::{Error, Result};

use std::collections::BTreeMap;
use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

/// One line of a structured diff. Old/new line numbers are present when the
/// line exists on that side of the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
    pub text: Rc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
    pub lines: Vec<Line>,
}

/// A structured, line-indexed diff for one file. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    hunks: Vec<Hunk>,
}

/// Raw input for one diff line: hunk coordinates plus the before/after
/// content. A purely added line has no `before`; a purely removed line has
/// no `after`. Present-but-empty content is a blank line, which is an
/// ordinary diff line.
#[derive(Debug, Clone)]
pub struct HunkLine {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl Diff {
    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.hunks.iter().flat_map(|h| h.lines.iter())
    }

    /// Number of added plus removed lines.
    pub fn changed_line_count(&self) -> usize {
        self.lines()
            .filter(|l| l.kind != LineKind::Context)
            .count()
    }

    /// True when any added or removed line matches `pattern`.
    pub fn has_pattern(&self, pattern: &Regex) -> bool {
        self.lines()
            .filter(|l| l.kind != LineKind::Context)
            .any(|l| pattern.is_match(&l.text))
    }

    /// True exactly for line numbers carried by added or removed lines;
    /// context-only lines are not part of the change.
    pub fn touches_line(&self, n: u32) -> bool {
        self.lines().any(|l| match l.kind {
            LineKind::Context => false,
            LineKind::Added => l.new_line == Some(n),
            LineKind::Removed => l.old_line == Some(n),
        })
    }
}

// Incremental construction state. Only `diff_from_hunks` drives this; the
// single-line append step is never exposed to consumers.
struct DiffBuilder {
    diff: Diff,
    next_old: u32,
    next_new: u32,
    last_old: u32,
    last_new: u32,
}

impl DiffBuilder {
    fn new() -> Self {
        Self {
            diff: Diff::default(),
            next_old: 0,
            next_new: 0,
            last_old: 0,
            last_new: 0,
        }
    }

    fn append(&mut self, raw: &HunkLine) -> Result<()> {
        let same_hunk = matches!(
            self.diff.hunks.last(),
            Some(h) if h.old_start == raw.old_start && h.new_start == raw.new_start
        );
        if !same_hunk {
            self.diff.hunks.push(Hunk {
                old_start: raw.old_start,
                old_len: raw.old_len,
                new_start: raw.new_start,
                new_len: raw.new_len,
                lines: vec![],
            });
            self.next_old = raw.old_start;
            self.next_new = raw.new_start;
        }

        match (&raw.before, &raw.after) {
            (None, None) => Err(Error::Parse(
                "hunk line with neither before nor after content".to_string(),
            )),
            (Some(before), None) => {
                let line = self.removed(before);
                self.push(line)
            }
            (None, Some(after)) => {
                let line = self.added(after);
                self.push(line)
            }
            (Some(before), Some(after)) if before == after => {
                let line = self.context(before);
                self.push(line)
            }
            // A pair with both sides present but different content is a
            // modified line: one removal plus one addition.
            (Some(before), Some(after)) => {
                let line = self.removed(before);
                self.push(line)?;
                let line = self.added(after);
                self.push(line)
            }
        }
    }

    fn removed(&mut self, text: &str) -> Line {
        let old_line = self.next_old;
        self.next_old += 1;
        Line {
            kind: LineKind::Removed,
            old_line: Some(old_line),
            new_line: None,
            text: text.into(),
        }
    }

    fn added(&mut self, text: &str) -> Line {
        let new_line = self.next_new;
        self.next_new += 1;
        Line {
            kind: LineKind::Added,
            old_line: None,
            new_line: Some(new_line),
            text: text.into(),
        }
    }

    fn context(&mut self, text: &str) -> Line {
        let (old_line, new_line) = (self.next_old, self.next_new);
        self.next_old += 1;
        self.next_new += 1;
        Line {
            kind: LineKind::Context,
            old_line: Some(old_line),
            new_line: Some(new_line),
            text: text.into(),
        }
    }

    fn push(&mut self, line: Line) -> Result<()> {
        // Line numbers must never decrease within one file.
        if let Some(old) = line.old_line {
            if old < self.last_old {
                return Err(Error::Parse(format!(
                    "old line number {old} decreases below {}",
                    self.last_old
                )));
            }
            self.last_old = old;
        }
        if let Some(new) = line.new_line {
            if new < self.last_new {
                return Err(Error::Parse(format!(
                    "new line number {new} decreases below {}",
                    self.last_new
                )));
            }
            self.last_new = new;
        }

        match self.diff.hunks.last_mut() {
            Some(hunk) => hunk.lines.push(line),
            None => {
                return Err(Error::Parse(
                    "diff builder appended a line with no open hunk".to_string(),
                ))
            }
        }
        Ok(())
    }
}

/// Build a structured diff from raw hunk line data.
///
/// Binary files yield an empty diff regardless of the supplied hunks.
pub fn diff_from_hunks(is_binary: bool, raw: &[HunkLine]) -> Result<Diff> {
    if is_binary {
        return Ok(Diff::default());
    }
    let mut builder = DiffBuilder::new();
    for line in raw {
        builder.append(line)?;
    }
    Ok(builder.diff)
}

lazy_static! {
    static ref HUNK_HEADER: Regex =
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk regex");
}

fn capture_u32(caps: &regex::Captures, idx: usize, default: u32) -> Result<u32> {
    match caps.get(idx) {
        Some(m) => m
            .as_str()
            .parse()
            .map_err(|_| Error::Parse(format!("hunk range `{}` out of range", m.as_str()))),
        None => Ok(default),
    }
}

/// Convert raw unified-diff text (the code host's per-file `patch` field)
/// into the hunk line records consumed by [`diff_from_hunks`].
pub fn parse_file_patch(patch: &str) -> Result<Vec<HunkLine>> {
    let mut out = vec![];
    let mut coords: Option<(u32, u32, u32, u32)> = None;

    for raw_line in patch.split('\n') {
        if let Some(caps) = HUNK_HEADER.captures(raw_line) {
            coords = Some((
                capture_u32(&caps, 1, 0)?,
                capture_u32(&caps, 2, 1)?,
                capture_u32(&caps, 3, 0)?,
                capture_u32(&caps, 4, 1)?,
            ));
            continue;
        }

        let (old_start, old_len, new_start, new_len) = match coords {
            Some(c) => c,
            None if raw_line.is_empty() => continue,
            None => {
                return Err(Error::Parse(format!(
                    "diff content before first hunk header: {raw_line:?}"
                )))
            }
        };

        // A lone `+`, `-` or ` ` (or a fully empty line) is a blank line
        // being added, removed or kept; blank lines are ordinary diff lines.
        let (before, after) = match raw_line.split_at_checked(1) {
            Some(("+", rest)) => (None, Some(rest.to_string())),
            Some(("-", rest)) => (Some(rest.to_string()), None),
            Some((" ", rest)) => (Some(rest.to_string()), Some(rest.to_string())),
            // "\ No newline at end of file"
            Some(("\\", _)) => continue,
            _ => (Some(raw_line.to_string()), Some(raw_line.to_string())),
        };

        out.push(HunkLine {
            old_start,
            old_len,
            new_start,
            new_len,
            before,
            after,
        });
    }

    Ok(out)
}

/// One changed file: the raw code-host record plus its structured diff.
#[derive(Debug, Clone)]
pub struct File {
    repr: CommitFile,
    diff: Diff,
}

impl File {
    pub fn new(repr: CommitFile) -> Result<File> {
        let diff = match &repr.patch {
            // The code host omits the patch text for binary files.
            None => diff_from_hunks(true, &[])?,
            Some(text) => diff_from_hunks(false, &parse_file_patch(text)?)?,
        };
        Ok(File { repr, diff })
    }

    pub fn filename(&self) -> &str {
        &self.repr.filename
    }

    pub fn repr(&self) -> &CommitFile {
        &self.repr
    }

    pub fn diff(&self) -> &Diff {
        &self.diff
    }
}

/// Per-file structured diffs for one pull request, keyed by filename.
/// Computed once at environment construction and immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    files: BTreeMap<String, File>,
}

impl Patch {
    pub fn from_files(files: Vec<CommitFile>) -> Result<Patch> {
        let mut map = BTreeMap::new();
        for repr in files {
            let name = repr.filename.clone();
            if map.contains_key(&name) {
                return Err(Error::DuplicateDefinition(name));
            }
            map.insert(name, File::new(repr)?);
        }
        Ok(Patch { files: map })
    }

    pub fn get(&self, filename: &str) -> Option<&File> {
        self.files.get(filename)
    }

    pub fn iter(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Added plus removed lines across every file.
    pub fn total_changed_lines(&self) -> usize {
        self.iter().map(|f| f.diff().changed_line_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hunk_line(
        coords: (u32, u32, u32, u32),
        before: Option<&str>,
        after: Option<&str>,
    ) -> HunkLine {
        HunkLine {
            old_start: coords.0,
            old_len: coords.1,
            new_start: coords.2,
            new_len: coords.3,
            before: before.map(str::to_string),
            after: after.map(str::to_string),
        }
    }

    #[test]
    fn kinds_follow_content() -> Result<()> {
        let diff = diff_from_hunks(
            false,
            &[
                hunk_line((2, 3, 2, 3), Some("unchanged"), Some("unchanged")),
                hunk_line((2, 3, 2, 3), Some("old text"), None),
                hunk_line((2, 3, 2, 3), None, Some("new text")),
            ],
        )?;
        let kinds: Vec<LineKind> = diff.lines().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LineKind::Context, LineKind::Removed, LineKind::Added]
        );
        assert_eq!(diff.changed_line_count(), 2);
        Ok(())
    }

    #[test]
    fn line_numbers_derive_from_ranges() -> Result<()> {
        let diff = diff_from_hunks(
            false,
            &[
                hunk_line(
                    (2, 2, 2, 3),
                    Some(" func previous1() {"),
                    Some(" func previous1() {"),
                ),
                hunk_line((2, 2, 2, 3), Some("old"), None),
                hunk_line((2, 2, 2, 3), None, Some("new")),
                hunk_line((2, 2, 2, 3), None, Some("extra")),
            ],
        )?;
        let lines: Vec<&Line> = diff.lines().collect();
        assert_eq!(lines[0].old_line, Some(2));
        assert_eq!(lines[0].new_line, Some(2));
        assert_eq!(lines[1].old_line, Some(3));
        assert_eq!(lines[2].new_line, Some(3));
        assert_eq!(lines[3].new_line, Some(4));
        Ok(())
    }

    #[test]
    fn binary_files_have_empty_diffs() -> Result<()> {
        let diff = diff_from_hunks(true, &[hunk_line((1, 1, 1, 1), None, Some("data"))])?;
        assert_eq!(diff.lines().count(), 0);
        Ok(())
    }

    #[test]
    fn decreasing_line_numbers_are_rejected() {
        let result = diff_from_hunks(
            false,
            &[
                hunk_line((10, 1, 10, 1), None, Some("later")),
                hunk_line((2, 1, 2, 1), None, Some("earlier")),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn modified_pair_splits_into_removed_and_added() -> Result<()> {
        let diff = diff_from_hunks(
            false,
            &[hunk_line(
                (2, 2, 2, 3),
                Some(" func previous1() {"),
                Some(" func new1() {"),
            )],
        )?;
        let lines: Vec<&Line> = diff.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].kind, LineKind::Removed);
        assert_eq!(lines[0].old_line, Some(2));
        assert_eq!(lines[1].kind, LineKind::Added);
        assert_eq!(lines[1].new_line, Some(2));
        assert_eq!(diff.changed_line_count(), 2);
        Ok(())
    }

    #[test]
    fn absent_pair_is_rejected() {
        let result = diff_from_hunks(false, &[hunk_line((1, 1, 1, 1), None, None)]);
        assert!(result.is_err());
    }

    #[test]
    fn blank_lines_are_ordinary_diff_lines() -> Result<()> {
        let diff = diff_from_hunks(
            false,
            &[
                hunk_line((1, 2, 1, 3), Some(""), Some("")),
                hunk_line((1, 2, 1, 3), Some(""), None),
                hunk_line((1, 2, 1, 3), None, Some("")),
            ],
        )?;
        let kinds: Vec<LineKind> = diff.lines().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LineKind::Context, LineKind::Removed, LineKind::Added]
        );
        assert_eq!(diff.changed_line_count(), 2);
        Ok(())
    }

    #[test]
    fn unified_patch_round_trip() -> Result<()> {
        let patch = "@@ -2,2 +2,3 @@ func main\n func previous1() {\n-old body\n+new body\n+second body";
        let hunks = parse_file_patch(patch)?;
        let diff = diff_from_hunks(false, &hunks)?;
        assert_eq!(diff.changed_line_count(), 3);
        assert!(diff.touches_line(3));
        assert!(diff.touches_line(4));
        // Line 2 is context on both sides.
        assert!(!diff.touches_line(2));
        Ok(())
    }

    #[test]
    fn equivalent_hunks_build_equal_diffs() -> Result<()> {
        let a = diff_from_hunks(
            false,
            &parse_file_patch("@@ -1,1 +1,2 @@\n keep\n+add")?,
        )?;
        let b = diff_from_hunks(
            false,
            &[
                hunk_line((1, 1, 1, 2), Some("keep"), Some("keep")),
                hunk_line((1, 1, 1, 2), None, Some("add")),
            ],
        )?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn duplicate_filenames_are_rejected() {
        let file = CommitFile {
            filename: "main.rs".to_string(),
            patch: None,
        };
        let result = Patch::from_files(vec![file.clone(), file]);
        assert!(matches!(result, Err(Error::DuplicateDefinition(_))));
    }

    #[test]
    fn pattern_query_skips_context_lines() -> Result<()> {
        let diff = diff_from_hunks(
            false,
            &[
                hunk_line((1, 2, 1, 2), Some("context fixme"), Some("context fixme")),
                hunk_line((1, 2, 1, 2), None, Some("added todo")),
            ],
        )?;
        assert!(diff.has_pattern(&Regex::new("todo").unwrap()));
        assert!(!diff.has_pattern(&Regex::new("fixme").unwrap()));
        Ok(())
    }
}
