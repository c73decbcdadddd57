//! Assignment documents handed to a worker.
//!
//! Pure string composition: every field of the item is embedded verbatim.

use crate::domain::{Role, WorkItem};

/// Assignment for an issue worked under `role`
pub fn compose_issue_assignment(item: &WorkItem, role: Role, profile: &str, repo: Option<&str>) -> String {
    let repository = match repo {
        Some(repo) => format!("\n## Repository\n{}\n", repo),
        None => String::new(),
    };

    format!(
        "# Factory Dispatch

## Task
You are a factory worker wearing the **{role}** hat.
Work on issue #{id}: {title}

## Issue Details
{body}

## Your Role Instructions
{profile}
{repository}
## Important
- Follow the hat workflow exactly
- Update the issue with progress
- Open a pull request when done (for code changes)
- Ask for help in issue comments if blocked
",
        role = role,
        id = item.id,
        title = item.title,
        body = item.body,
        profile = profile,
        repository = repository,
    )
}

/// Assignment for reviewing a review request under `role`
pub fn compose_review_assignment(item: &WorkItem, role: Role, profile: &str) -> String {
    let (files, additions, deletions) = match &item.review {
        Some(metrics) => (
            metrics
                .files
                .iter()
                .map(|f| format!("- {}", f))
                .collect::<Vec<_>>()
                .join("\n"),
            metrics.additions,
            metrics.deletions,
        ),
        None => (String::new(), 0, 0),
    };

    format!(
        "# Factory Dispatch - Code Review

## Task
You are a factory worker wearing the **{role}** hat.
Review PR #{id}: {title}

## PR Details
URL: {url}
Files changed:
{files}
+{additions} -{deletions}

## PR Description
{body}

## Your Role Instructions
{profile}

## Important
- Use `gh pr diff {id}` to see the actual changes
- Follow the review checklist
- Be constructive in feedback
",
        role = role,
        id = item.id,
        title = item.title,
        url = item.url.as_deref().unwrap_or(""),
        files = files,
        additions = additions,
        deletions = deletions,
        body = item.body,
        profile = profile,
    )
}
