use crate::github::types::{FileChange, FileContent, IssueDetails};

/// Attribution tag downstream consumers match on. Must stay byte-for-byte identical.
pub const MARKER: &str = "<<SOLVER:0x0543ae55a38fe8bb1041efb7f6135bb23e61d422>>";

pub const README_PATH: &str = "README.md";

const ISSUE_AWARE_SUFFIX: &str = "\nhello";

pub fn commit_message(issue_number: u64) -> String {
    format!("Fix issue #{issue_number}")
}

pub fn readme_footer(issue_number: u64) -> String {
    format!("\n\n---\n\nThis PR addresses issue #{issue_number}\n\n{MARKER}")
}

/// Appends the footer to an existing README, or creates one with a header.
pub fn minimal_change(existing: Option<FileContent>, issue_number: u64) -> FileChange {
    let footer = readme_footer(issue_number);
    match existing {
        Some(file) => FileChange {
            path: file.path,
            content: file.text + &footer,
            prior_sha: Some(file.sha),
        },
        None => FileChange {
            path: README_PATH.to_string(),
            content: format!("# README\n{footer}"),
            prior_sha: None,
        },
    }
}

/// Picks the files an issue-aware run edits. Only `README.md` at the root is
/// ever chosen; there is no relevance ranking.
pub fn select_targets(tree: &[String]) -> Vec<String> {
    tree.iter()
        .filter(|path| path.as_str() == README_PATH)
        .cloned()
        .collect()
}

pub fn issue_aware_change(file: FileContent) -> FileChange {
    FileChange {
        path: file.path,
        content: file.text + ISSUE_AWARE_SUFFIX,
        prior_sha: Some(file.sha),
    }
}

pub fn pull_request_title(issue_number: u64, issue: Option<&IssueDetails>) -> String {
    match issue {
        Some(issue) if !issue.title.is_empty() => {
            format!("Fixes #{issue_number}: {}", issue.title)
        }
        _ => format!("Fixes #{issue_number}"),
    }
}

pub fn pull_request_body(
    issue_number: u64,
    issue: Option<&IssueDetails>,
    changed: &[String],
) -> String {
    let mut body = format!("This PR fixes issue #{issue_number}.\n\n");

    if let Some(issue) = issue {
        body.push_str("Changed files:\n");
        if changed.is_empty() {
            body.push_str("- (none)\n");
        }
        for path in changed {
            body.push_str(&format!("- {path}\n"));
        }
        body.push_str("\nOriginal issue:\n\n");
        body.push_str(&issue.body);
        body.push_str("\n\n");
    }

    body.push_str(MARKER);
    body
}
