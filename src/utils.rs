//! Path helpers for download destinations

use std::path::{Path, PathBuf};

use crate::types::TaskId;

/// Derive the on-disk filename for a task's file from its URL.
///
/// Uses the percent-decoded last path segment of the URL (the query string and
/// fragment are not part of the path). Falls back to `file_<index>` when the URL does
/// not parse, has no path segments, ends in an empty segment, or the segment decodes
/// to something that is not a plain file name.
///
/// # Examples
///
/// ```
/// use batch_dl::utils::derive_file_name;
///
/// assert_eq!(derive_file_name("https://x/a/b.zip", 0), "b.zip");
/// assert_eq!(derive_file_name("https://x/", 3), "file_3");
/// assert_eq!(derive_file_name("https://x", 1), "file_1");
/// assert_eq!(derive_file_name("https://x/my%20file.zip", 0), "my file.zip");
/// ```
pub fn derive_file_name(raw_url: &str, index: usize) -> String {
    if let Ok(parsed_url) = url::Url::parse(raw_url)
        && let Some(mut segments) = parsed_url.path_segments()
        && let Some(last_segment) = segments.next_back()
        && let Ok(decoded) = urlencoding::decode(last_segment)
        && is_usable_segment(&decoded)
    {
        return decoded.into_owned();
    }

    format!("file_{index}")
}

fn is_usable_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

/// Derived file names that more than one URL of a batch maps to
///
/// Such files share one destination, so only the last one written survives on disk.
pub fn colliding_file_names<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashMap::new();
    for (index, url) in urls.iter().enumerate() {
        *seen
            .entry(derive_file_name(url.as_ref(), index))
            .or_insert(0usize) += 1;
    }

    let mut colliding: Vec<String> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect();
    colliding.sort();
    colliding
}

/// Directory holding every file of one task
pub fn task_dir(download_dir: &Path, task_id: &TaskId) -> PathBuf {
    download_dir.join(task_id.as_str())
}

/// Full destination path for file `index` of a task
pub fn destination_path(download_dir: &Path, task_id: &TaskId, url: &str, index: usize) -> PathBuf {
    task_dir(download_dir, task_id).join(derive_file_name(url, index))
}

/// Sibling temporary path used by one attempt while a file is being written
///
/// `attempt` keeps concurrent writers of the same destination apart.
pub fn partial_path(dest: &Path, attempt: u64) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(format!(".{attempt:016x}.part"));
    PathBuf::from(name)
}
