// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use aladino::{diff_from_hunks, parse_file_patch, CommitFile, Error, LineKind, Patch};

fn text_file(name: &str, patch: &str) -> CommitFile {
    CommitFile {
        filename: name.to_string(),
        patch: Some(patch.to_string()),
    }
}

fn binary_file(name: &str) -> CommitFile {
    CommitFile {
        filename: name.to_string(),
        patch: None,
    }
}

#[test]
fn mixed_text_and_binary_files() -> anyhow::Result<()> {
    let patch = Patch::from_files(vec![
        text_file("src/lib.rs", "@@ -1,1 +1,2 @@\n keep\n+add"),
        binary_file("logo.png"),
    ])?;

    assert_eq!(patch.len(), 2);
    assert_eq!(patch.total_changed_lines(), 1);
    let binary = patch.get("logo.png").expect("binary file present");
    assert_eq!(binary.diff().lines().count(), 0);
    assert!(patch.get("missing.rs").is_none());
    Ok(())
}

#[test]
fn files_iterate_in_filename_order() -> anyhow::Result<()> {
    let patch = Patch::from_files(vec![
        binary_file("zz.bin"),
        binary_file("aa.bin"),
        binary_file("mm.bin"),
    ])?;
    let names: Vec<&str> = patch.iter().map(|f| f.filename()).collect();
    assert_eq!(names, vec!["aa.bin", "mm.bin", "zz.bin"]);
    Ok(())
}

#[test]
fn touches_line_tracks_each_side_of_the_change() -> anyhow::Result<()> {
    // Old lines 3 and 4 are removed, new lines 3 and 4 are added; lines 2
    // and 5 are context on both sides.
    let patch = "@@ -2,4 +2,4 @@ package main\n context line\n-func previous1() {\n-func previous2() {\n+func new1() {\n+func new2() {\n context line";
    let diff = diff_from_hunks(false, &parse_file_patch(patch)?)?;

    assert_eq!(diff.changed_line_count(), 4);
    assert!(diff.touches_line(3));
    assert!(diff.touches_line(4));
    assert!(!diff.touches_line(2));
    assert!(!diff.touches_line(5));
    Ok(())
}

#[test]
fn parsing_is_deterministic() -> anyhow::Result<()> {
    let patch = "@@ -10,3 +10,4 @@\n context\n-gone\n+here\n+also here\n context";
    let a = diff_from_hunks(false, &parse_file_patch(patch)?)?;
    let b = diff_from_hunks(false, &parse_file_patch(patch)?)?;
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn multiple_hunks_keep_their_coordinates() -> anyhow::Result<()> {
    let patch = "@@ -1,1 +1,2 @@\n one\n+two\n@@ -10,2 +11,1 @@\n ten\n-eleven";
    let diff = diff_from_hunks(false, &parse_file_patch(patch)?)?;

    assert_eq!(diff.hunks().len(), 2);
    assert_eq!(diff.hunks()[0].new_start, 1);
    assert_eq!(diff.hunks()[1].old_start, 10);

    let kinds: Vec<LineKind> = diff.lines().map(|l| l.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LineKind::Context,
            LineKind::Added,
            LineKind::Context,
            LineKind::Removed
        ]
    );
    Ok(())
}

#[test]
fn content_before_a_hunk_header_is_rejected() {
    assert!(parse_file_patch("not a diff").is_err());
}

#[test]
fn malformed_file_patch_fails_environment_construction() {
    let result = Patch::from_files(vec![text_file("src/lib.rs", "garbage before header")]);
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[test]
fn blank_lines_survive_patch_ingestion() -> anyhow::Result<()> {
    // A lone `+`, a lone ` ` and a fully empty line are blank lines being
    // added or kept, not malformed input.
    let patch = Patch::from_files(vec![text_file(
        "src/lib.rs",
        "@@ -1,3 +1,4 @@\n a\n \n+b\n+",
    )])?;
    let file = patch.get("src/lib.rs").expect("file present");
    assert_eq!(file.diff().changed_line_count(), 2);
    let kinds: Vec<LineKind> = file.diff().lines().map(|l| l.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LineKind::Context,
            LineKind::Context,
            LineKind::Added,
            LineKind::Added
        ]
    );
    Ok(())
}

#[test]
fn real_world_patch_with_blank_added_line() -> anyhow::Result<()> {
    let patch = "@@ -2,9 +2,11 @@ package main\n- func previous1() {\n+ func new1() {\n+\nreturn";
    let diff = diff_from_hunks(false, &parse_file_patch(patch)?)?;

    let kinds: Vec<LineKind> = diff.lines().map(|l| l.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LineKind::Removed,
            LineKind::Added,
            LineKind::Added,
            LineKind::Context
        ]
    );
    assert_eq!(diff.changed_line_count(), 3);
    Ok(())
}

#[test]
fn no_newline_marker_is_ignored() -> anyhow::Result<()> {
    let patch = "@@ -1,1 +1,1 @@\n-old\n+new\n\\ No newline at end of file";
    let diff = diff_from_hunks(false, &parse_file_patch(patch)?)?;
    assert_eq!(diff.changed_line_count(), 2);
    Ok(())
}
