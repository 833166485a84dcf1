//! Text-mode evaluation.

use super::{Action, ActionList};
use crate::error::{ReporterError, Result};

impl ActionList {
    /// Evaluate against a string. `find` without a match yields `Ok(None)`;
    /// more than one match is an error.
    pub fn evaluate_text(&self, input: &str) -> Result<Option<String>> {
        let mut out = String::new();
        for action in self.iter() {
            match action {
                Action::AddString(s) => out.push_str(s),
                Action::Find(pattern) => {
                    let mut matches = pattern.captures_iter(input);
                    let Some(first) = matches.next() else {
                        return Ok(None);
                    };
                    let extra = matches.count();
                    if extra > 0 {
                        return Err(ReporterError::AmbiguousMatch {
                            pattern: pattern.as_str().to_string(),
                            count: extra + 1,
                            input: input.to_string(),
                        });
                    }
                    if let Some(m) = first.get(1).or_else(|| first.get(0)) {
                        out.push_str(m.as_str());
                    }
                }
                Action::Replace { old, new } => out = out.replace(old.as_str(), new),
                Action::CustomMap(entries) => {
                    if let Some((label, _)) = entries.iter().find(|(_, p)| p.is_match(input)) {
                        out.push_str(label);
                    }
                }
                Action::GetAttribute(_)
                | Action::GetElementText
                | Action::CheckParent { .. }
                | Action::CheckChild { .. }
                | Action::HasChildTag { .. } => {
                    return Err(ReporterError::UnknownAction {
                        action: action.key().to_string(),
                    })
                }
            }
        }
        Ok(Some(out))
    }
}
