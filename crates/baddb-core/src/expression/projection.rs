//! Compiles projection expressions and applies them to entries.

use std::collections::HashMap;
use std::fmt;

use baddb_model::{AttributeValue, Entry, PathOperand};

use super::eval::bind_path;
use super::parser::{ExpressionError, parse_projection};

/// A compiled projection expression: the set of document paths to keep.
pub struct ProjectionExpression {
    text: String,
    paths: Vec<PathOperand>,
}

impl ProjectionExpression {
    /// Parses and binds a projection expression.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError` on a syntax error, overlapping or
    /// conflicting paths, or an unresolvable `#name` placeholder.
    pub fn new(text: &str, names: &HashMap<String, String>) -> Result<Self, ExpressionError> {
        let parsed = parse_projection(text)?;
        let paths = parsed
            .iter()
            .map(|path| bind_path(path, names))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            text: text.to_owned(),
            paths,
        })
    }

    /// The original expression text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Builds a new entry containing only the projected paths, preserving
    /// the nesting of the leaves that resolve. Projected list elements are
    /// appended densely rather than padded to their original index.
    #[must_use]
    pub fn apply(&self, entry: &Entry) -> Entry {
        let mut out = Entry::new();
        for path in &self.paths {
            if let Some(value) = entry.get_path(path) {
                deep_insert(&mut out, path, value.clone());
            }
        }
        out
    }
}

impl fmt::Debug for ProjectionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionExpression")
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

/// A projection path flattened root-first.
enum Element<'a> {
    Field(&'a str),
    Index,
}

fn flatten<'a>(path: &'a PathOperand, out: &mut Vec<Element<'a>>) {
    match path {
        PathOperand::Name(name) => out.push(Element::Field(name)),
        PathOperand::Index(base, _) => {
            flatten(base, out);
            out.push(Element::Index);
        }
        PathOperand::Dot(base, field) => {
            flatten(base, out);
            out.push(Element::Field(field));
        }
    }
}

/// Inserts a value into the output entry at the given path, creating
/// intermediate maps and lists as needed.
fn deep_insert(out: &mut Entry, path: &PathOperand, value: AttributeValue) {
    let mut elements = Vec::new();
    flatten(path, &mut elements);

    let Some(Element::Field(root)) = elements.first() else {
        return;
    };

    if elements.len() == 1 {
        out.insert((*root).to_owned(), value);
        return;
    }

    let mut slot = out
        .attributes()
        .get(*root)
        .cloned()
        .unwrap_or_else(|| empty_container(&elements[1]));
    insert_into(&mut slot, &elements[1..], value);
    out.insert((*root).to_owned(), slot);
}

fn empty_container(next: &Element<'_>) -> AttributeValue {
    match next {
        Element::Field(_) => AttributeValue::M(HashMap::new()),
        Element::Index => AttributeValue::L(Vec::new()),
    }
}

fn insert_into(target: &mut AttributeValue, elements: &[Element<'_>], value: AttributeValue) {
    let Some(first) = elements.first() else {
        return;
    };

    if elements.len() == 1 {
        match (first, target) {
            (Element::Field(field), AttributeValue::M(map)) => {
                map.insert((*field).to_owned(), value);
            }
            (Element::Index, AttributeValue::L(list)) => list.push(value),
            _ => {}
        }
        return;
    }

    match (first, target) {
        (Element::Field(field), AttributeValue::M(map)) => {
            let slot = map
                .entry((*field).to_owned())
                .or_insert_with(|| empty_container(&elements[1]));
            insert_into(slot, &elements[1..], value);
        }
        (Element::Index, AttributeValue::L(list)) => {
            // Successive projected indices on the same list append in path
            // order.
            list.push(empty_container(&elements[1]));
            if let Some(slot) = list.last_mut() {
                insert_into(slot, &elements[1..], value);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> Entry {
        let mut info = HashMap::new();
        info.insert("rating".to_owned(), AttributeValue::N("8".to_owned()));
        info.insert("votes".to_owned(), AttributeValue::N("42".to_owned()));

        let mut entry = Entry::new();
        entry.insert("title", AttributeValue::S("Hello".to_owned()));
        entry.insert("year", AttributeValue::N("2025".to_owned()));
        entry.insert("info", AttributeValue::M(info));
        entry.insert(
            "genres",
            AttributeValue::L(vec![
                AttributeValue::S("drama".to_owned()),
                AttributeValue::S("comedy".to_owned()),
            ]),
        );
        entry
    }

    #[test]
    fn test_should_project_top_level_attributes() {
        let proj = ProjectionExpression::new("title, year", &HashMap::new()).unwrap();
        let out = proj.apply(&sample_entry());
        assert_eq!(out.len(), 2);
        assert!(out.get("title").is_some());
        assert!(out.get("info").is_none());
    }

    #[test]
    fn test_should_project_nested_paths() {
        let proj = ProjectionExpression::new("info.rating", &HashMap::new()).unwrap();
        let out = proj.apply(&sample_entry());
        let AttributeValue::M(info) = out.get("info").unwrap() else {
            panic!("expected a map");
        };
        assert_eq!(info.len(), 1);
        assert_eq!(info.get("rating"), Some(&AttributeValue::N("8".to_owned())));
    }

    #[test]
    fn test_should_merge_sibling_projections() {
        let proj = ProjectionExpression::new("info.rating, info.votes", &HashMap::new()).unwrap();
        let out = proj.apply(&sample_entry());
        let AttributeValue::M(info) = out.get("info").unwrap() else {
            panic!("expected a map");
        };
        assert_eq!(info.len(), 2);
    }

    #[test]
    fn test_should_project_list_elements_densely() {
        let proj = ProjectionExpression::new("genres[1]", &HashMap::new()).unwrap();
        let out = proj.apply(&sample_entry());
        let AttributeValue::L(list) = out.get("genres").unwrap() else {
            panic!("expected a list");
        };
        assert_eq!(list, &vec![AttributeValue::S("comedy".to_owned())]);
    }

    #[test]
    fn test_should_skip_unresolvable_paths() {
        let proj = ProjectionExpression::new("title, absent.deep", &HashMap::new()).unwrap();
        let out = proj.apply(&sample_entry());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_should_bind_placeholders() {
        let mut names = HashMap::new();
        names.insert("#t".to_owned(), "title".to_owned());
        let proj = ProjectionExpression::new("#t", &names).unwrap();
        let out = proj.apply(&sample_entry());
        assert!(out.get("title").is_some());
    }
}
