//! Node-mode evaluation.

use super::{Action, ActionList};
use crate::error::{ReporterError, Result};

/// Minimal read-only view of a report element.
pub trait ReportNode: Sized {
    fn tag(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn text(&self) -> Option<&str>;
    /// Element children in document order.
    fn child_elements(&self) -> Vec<Self>;
}

impl<'a, 'input: 'a> ReportNode for roxmltree::Node<'a, 'input> {
    fn tag(&self) -> &str {
        self.tag_name().name()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        roxmltree::Node::attribute(self, name)
    }

    fn text(&self) -> Option<&str> {
        roxmltree::Node::text(self)
    }

    fn child_elements(&self) -> Vec<Self> {
        self.children().filter(|n| n.is_element()).collect()
    }
}

impl ActionList {
    /// Evaluate against a report node. A missing attribute fails with
    /// `AttributeMissing`; missing element text contributes nothing.
    pub fn evaluate_node<N: ReportNode>(&self, node: &N) -> Result<String> {
        let mut out = String::new();
        self.apply_node(node, &mut out)?;
        Ok(out)
    }

    fn apply_node<N: ReportNode>(&self, node: &N, out: &mut String) -> Result<()> {
        for action in self.iter() {
            match action {
                Action::AddString(s) => out.push_str(s),
                Action::GetAttribute(name) => {
                    let value = node.attribute(name).ok_or_else(|| ReporterError::AttributeMissing {
                        tag: node.tag().to_string(),
                        name: name.clone(),
                    })?;
                    out.push_str(value);
                }
                Action::GetElementText => out.push_str(node.text().unwrap_or_default()),
                Action::CheckParent { attribute, actions } => {
                    if node.attribute(attribute).is_some() {
                        actions.apply_node(node, out)?;
                    }
                }
                Action::CheckChild {
                    tag,
                    attribute,
                    actions,
                } => {
                    let child = node.child_elements().into_iter().find(|c| {
                        tag.as_deref().map_or(true, |t| c.tag() == t)
                            && attribute.as_deref().map_or(true, |a| c.attribute(a).is_some())
                    });
                    if let Some(child) = child {
                        actions.apply_node(&child, out)?;
                    }
                }
                Action::HasChildTag { tag, actions } => {
                    let child = node.child_elements().into_iter().find(|c| c.tag() == tag);
                    if let Some(child) = child {
                        actions.apply_node(&child, out)?;
                    }
                }
                Action::Replace { old, new } => *out = out.replace(old.as_str(), new),
                Action::Find(_) | Action::CustomMap(_) => {
                    return Err(ReporterError::UnknownAction {
                        action: action.key().to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}
