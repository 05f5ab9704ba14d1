#![forbid(unsafe_code)]

//! Selector dialect for tree queries.
//!
//! Grammar, deliberately small:
//!
//! ```text
//! list     = compound ("," compound)*
//! compound = "*" | (tag)? ("#" id)? ("." class)*
//! ```
//!
//! A compound matches an element when every constraint holds: tag equality,
//! id equality, and every listed class present. `*` matches everything. An
//! element matches a list when it matches any compound in it.
//!
//! Parsing never panics; malformed input yields `None` and a query against
//! it matches nothing.

/// One compound selector: all constraints must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleSelector {
    /// Required tag name, if any.
    pub tag: Option<String>,
    /// Required id, if any.
    pub id: Option<String>,
    /// Classes that must all be present.
    pub classes: Vec<String>,
}

impl SimpleSelector {
    /// Whether this compound is the universal `*` (no constraints at all).
    #[must_use]
    pub fn is_universal(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty()
    }
}

/// A comma-separated selector group. Matching is any-of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList {
    /// The alternatives, in source order.
    pub compounds: Vec<SimpleSelector>,
}

/// Parse a selector list. Returns `None` on malformed input: an empty
/// string, an empty group, a dangling `#` or `.`, an identifier with
/// characters outside `[A-Za-z0-9_-]`, or `*` combined with constraints.
#[must_use]
pub fn parse(input: &str) -> Option<SelectorList> {
    let mut compounds = Vec::new();
    for group in input.split(',') {
        compounds.push(parse_compound(group.trim())?);
    }
    Some(SelectorList { compounds })
}

fn parse_compound(input: &str) -> Option<SimpleSelector> {
    if input.is_empty() {
        return None;
    }
    if input == "*" {
        return Some(SimpleSelector::default());
    }
    let mut selector = SimpleSelector::default();
    let mut rest = input;
    if !rest.starts_with(['#', '.']) {
        let end = rest
            .find(['#', '.'])
            .unwrap_or(rest.len());
        let (tag, tail) = rest.split_at(end);
        if !is_identifier(tag) {
            return None;
        }
        selector.tag = Some(tag.to_owned());
        rest = tail;
    }
    while !rest.is_empty() {
        let (marker, tail) = rest.split_at(1);
        let end = tail.find(['#', '.']).unwrap_or(tail.len());
        let (name, next) = tail.split_at(end);
        if !is_identifier(name) {
            return None;
        }
        match marker {
            "#" => {
                // A second id constraint can never match; reject it.
                if selector.id.is_some() {
                    return None;
                }
                selector.id = Some(name.to_owned());
            }
            "." => selector.classes.push(name.to_owned()),
            _ => return None,
        }
        rest = next;
    }
    Some(selector)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Whether an element described by `(tag, id, classes)` matches `compound`.
pub(crate) fn matches(
    compound: &SimpleSelector,
    tag: &str,
    id: Option<&str>,
    classes: &[String],
) -> bool {
    if let Some(want) = &compound.tag {
        if want != tag {
            return false;
        }
    }
    if let Some(want) = &compound.id {
        if id != Some(want.as_str()) {
            return false;
        }
    }
    compound.classes.iter().all(|c| classes.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_tag() {
        let list = parse("button").expect("parse");
        assert_eq!(list.compounds.len(), 1);
        assert_eq!(list.compounds[0].tag.as_deref(), Some("button"));
    }

    #[test]
    fn parses_compound_with_id_and_classes() {
        let list = parse("input#name.required.wide").expect("parse");
        let compound = &list.compounds[0];
        assert_eq!(compound.tag.as_deref(), Some("input"));
        assert_eq!(compound.id.as_deref(), Some("name"));
        assert_eq!(compound.classes, ["required", "wide"]);
    }

    #[test]
    fn parses_bare_class_and_bare_id() {
        let class_only = parse(".active").expect("parse");
        assert_eq!(class_only.compounds[0].tag, None);
        assert_eq!(class_only.compounds[0].classes, ["active"]);

        let id_only = parse("#main").expect("parse");
        assert_eq!(id_only.compounds[0].id.as_deref(), Some("main"));
    }

    #[test]
    fn parses_comma_groups() {
        let list = parse("button, .active , #main").expect("parse");
        assert_eq!(list.compounds.len(), 3);
    }

    #[test]
    fn universal_matches_everything() {
        let list = parse("*").expect("parse");
        assert!(list.compounds[0].is_universal());
        assert!(matches(&list.compounds[0], "anything", None, &[]));
    }

    #[test]
    fn malformed_input_is_rejected_not_panicked() {
        for bad in ["", " ", "#", ".", "button#", "div..x", "a,,b", "a b", "#x#y", "*#x"] {
            assert_eq!(parse(bad), None, "input {bad:?} should be rejected");
        }
    }

    #[test]
    fn matching_requires_every_constraint() {
        let compound = &parse("button#save.primary").expect("parse").compounds[0];
        let classes = vec!["primary".to_owned(), "wide".to_owned()];
        assert!(matches(compound, "button", Some("save"), &classes));
        assert!(!matches(compound, "div", Some("save"), &classes));
        assert!(!matches(compound, "button", Some("other"), &classes));
        assert!(!matches(compound, "button", Some("save"), &[]));
    }
}
