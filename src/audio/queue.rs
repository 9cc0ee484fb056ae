//! Helpers for navigating the audio queue.
//!
//! An audiobook queue never loops or shuffles: it runs front to back and
//! stops after the last file.

use std::path::Path;

use super::types::QueueItem;

/// Position of the item whose file name is `file_name`.
///
/// Falls back to a suffix match on the full path so a recorded name with a
/// sub-path still resolves.
pub(crate) fn index_of_file(items: &[QueueItem], file_name: &str) -> Option<usize> {
    let by_name = items.iter().position(|item| {
        item.path
            .file_name()
            .and_then(|s| s.to_str())
            .map(|name| name == file_name)
            .unwrap_or(false)
    });

    by_name.or_else(|| {
        items
            .iter()
            .position(|item| item.path.ends_with(Path::new(file_name)))
    })
}

/// Position after `current`, or `None` when the queue is exhausted.
pub(crate) fn next_position(current: Option<usize>, len: usize) -> Option<usize> {
    let next = current.map_or(0, |c| c + 1);
    (next < len).then_some(next)
}

/// Position before `current`; the first item restarts itself.
pub(crate) fn previous_position(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(current.map_or(0, |c| c.saturating_sub(1)).min(len - 1))
}
