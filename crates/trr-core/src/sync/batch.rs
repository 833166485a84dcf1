//! Result batching under a payload limit and comment truncation.

use serde_json::Value;

/// Placed between the kept head and tail of a truncated comment.
pub const OMITTED_MARKER: &str = "< ----- logs were omitted due to limit ----- >";

/// Group results into consecutive batches whose serialized JSON array is at
/// most `limit` bytes. A result that alone exceeds the limit becomes its own
/// batch. Without a limit everything goes into one batch. Order is kept.
pub fn split_into_batches(results: Vec<Value>, limit: Option<usize>) -> Vec<Vec<Value>> {
    if results.is_empty() {
        return Vec::new();
    }
    let Some(limit) = limit.filter(|l| *l > 0) else {
        return vec![results];
    };

    let mut batches = Vec::new();
    let mut batch: Vec<Value> = Vec::new();
    // Size of the serialized array: brackets plus separators plus items.
    let mut size = 2;
    for result in results {
        let item = result.to_string().len();
        let grown = size + item + usize::from(!batch.is_empty());
        if grown > limit && !batch.is_empty() {
            batches.push(std::mem::take(&mut batch));
            size = 2 + item;
        } else {
            size = grown;
        }
        batch.push(result);
    }
    batches.push(batch);
    batches
}

/// Keep `limit / 2` characters from each end of `comment` around
/// [`OMITTED_MARKER`]. Comments within the limit are returned unchanged.
pub fn truncate_comment(comment: &str, limit: usize) -> String {
    let total = comment.chars().count();
    if limit == 0 || total <= limit {
        return comment.to_string();
    }
    let keep = limit / 2;
    let head: String = comment.chars().take(keep).collect();
    let tail: String = comment.chars().skip(total - keep).collect();
    format!("{}\n{}\n{}", head, OMITTED_MARKER, tail)
}
