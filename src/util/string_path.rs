//! Normalization of textual paths as they are handed to resources.

use std::collections::VecDeque;

const FOLDER_SEPARATOR: char = '/';
const WINDOWS_FOLDER_SEPARATOR: char = '\\';
const TOP_PATH: &str = "..";
const CURRENT_PATH: &str = ".";

/// Normalize a path by collapsing alternate separators and resolving `.` and `..` segments.
///
/// A prefix up to the first `:` (a scheme or a drive letter) is kept as long as it does not
/// contain a separator. Leading `..` segments which cannot be resolved are retained, empty
/// segments are kept as they are. If no segment had to be dropped, the separator-normalized
/// input is returned.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let normalized = path.replace(WINDOWS_FOLDER_SEPARATOR, "/");
    if !normalized.contains('.') {
        return normalized;
    }

    let mut prefix = String::new();
    let mut path_to_use = normalized.as_str();
    if let Some(prefix_index) = path_to_use.find(':') {
        let candidate = &path_to_use[..=prefix_index];
        if !candidate.contains(FOLDER_SEPARATOR) {
            prefix.push_str(candidate);
            path_to_use = &path_to_use[prefix_index + 1..];
        }
    }
    if let Some(stripped) = path_to_use.strip_prefix(FOLDER_SEPARATOR) {
        prefix.push(FOLDER_SEPARATOR);
        path_to_use = stripped;
    }

    let segments: Vec<&str> = path_to_use.split(FOLDER_SEPARATOR).collect();
    let mut elements = VecDeque::with_capacity(segments.len());
    let mut tops = 0usize;
    for segment in segments.iter().rev() {
        match *segment {
            CURRENT_PATH => {}
            TOP_PATH => tops += 1,
            _ if tops > 0 => tops -= 1,
            element => elements.push_front(element),
        }
    }

    if segments.len() == elements.len() {
        return normalized;
    }
    for _ in 0..tops {
        elements.push_front(TOP_PATH);
    }
    if elements.len() == 1 && elements[0].is_empty() && !prefix.ends_with(FOLDER_SEPARATOR) {
        elements.push_front(CURRENT_PATH);
    }

    let joined: Vec<&str> = elements.into_iter().collect();
    prefix + &joined.join("/")
}

/// Apply a relative path to a base path, replacing the last segment of the base.
///
/// `apply_relative_path("/a/b/file.txt", "sibling.txt")` yields `/a/b/sibling.txt`. A base
/// without any separator is replaced entirely.
pub fn apply_relative_path(path: &str, relative_path: &str) -> String {
    match path.rfind(FOLDER_SEPARATOR) {
        Some(separator_index) => {
            let mut new_path = String::with_capacity(separator_index + relative_path.len() + 1);
            new_path.push_str(&path[..separator_index]);
            if !relative_path.starts_with(FOLDER_SEPARATOR) {
                new_path.push(FOLDER_SEPARATOR);
            }
            new_path.push_str(relative_path);
            new_path
        }
        None => relative_path.to_string(),
    }
}
