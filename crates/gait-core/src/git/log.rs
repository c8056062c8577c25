//! Parser for `git log --follow --name-only` output.

use super::CommitInfo;

/// Record separator printed before every commit header.
const RECORD_SEPARATOR: char = '\u{1e}';

/// `--format` argument matching [`parse_log`].
///
/// Each record is `RS hash TAB author TAB date TAB subject`, followed by the
/// file names git prints for `--name-only`.
pub const LOG_FORMAT: &str = "--format=%x1e%H%x09%an%x09%ad%x09%s";

/// Parses log output into commits, oldest first.
///
/// Git prints newest first; the result is reversed. Records without a header
/// of four tab-separated fields are skipped. When git does not list a path for
/// a commit, the path of the next newer commit is used.
///
/// Listed paths are relative to the repository root. `fallback_path` is
/// relative to the working directory and is therefore returned as `./path`,
/// which `git show <commit>:./path` resolves from the working directory.
pub fn parse_log(output: &str, fallback_path: &str) -> Vec<CommitInfo> {
    let mut commits: Vec<CommitInfo> = Vec::new();
    let mut last_path = working_dir_relative(fallback_path);

    for record in output.split(RECORD_SEPARATOR) {
        let mut lines = record.lines();
        let Some(header) = lines.next() else {
            continue;
        };
        let mut fields = header.splitn(4, '\t');
        let (Some(hash), Some(author), Some(date), Some(message)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            if !header.trim().is_empty() {
                tracing::debug!("Skipping malformed log header: {:?}", header);
            }
            continue;
        };
        if hash.trim().is_empty() {
            continue;
        }

        let path = lines
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| last_path.clone());
        last_path = path.clone();

        commits.push(CommitInfo {
            hash: hash.trim().to_string(),
            author: author.to_string(),
            date: date.to_string(),
            message: message.to_string(),
            path,
        });
    }

    commits.reverse();
    commits
}

fn working_dir_relative(path: &str) -> String {
    if path.starts_with("./") || path.starts_with('/') {
        path.to_string()
    } else {
        format!("./{}", path)
    }
}
