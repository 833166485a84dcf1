//! Tool-owned block inside plan and run descriptions.

pub const DESCRIPTION_BEGIN: &str = "_\r\n**=== Description message (TestRail reporter tool) ===**";
pub const DESCRIPTION_END: &str = "**=== End description message (TestRail reporter tool) ===**\r\n_";

/// Put `text` into the tool block of `current`. An existing block is
/// replaced and user text around it is preserved; otherwise the block is
/// appended.
pub fn merge_description(current: Option<&str>, text: &str) -> String {
    let block = format!("{}\r\n{}\r\n{}", DESCRIPTION_BEGIN, text, DESCRIPTION_END);
    let current = current.unwrap_or_default();

    let Some(begin) = current.rfind(DESCRIPTION_BEGIN) else {
        return format!("{}{}", current, block);
    };
    let after = &current[begin..];
    let tail = after
        .rfind(DESCRIPTION_END)
        .map(|end| &after[end + DESCRIPTION_END.len()..])
        .unwrap_or_default();
    format!("{}{}{}", &current[..begin], block, tail)
}
