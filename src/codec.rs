//! Decoding of cycle-encoded API responses.
//!
//! The API serializes record graphs with JSON-path back-references: a value
//! seen before is replaced by `{"$ref": "$[\"result\"][\"out_AliasOf\"][0]"}`.
//! [`retrocycle`] turns such a document back into a plain tree.

use log::warn;
use serde_json::{Map, Value, json};

use crate::components::kb_graph::types::{CLASS, RID};

const REF: &str = "$ref";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
	Key(String),
	Index(usize),
}

/// Resolves every `$ref` in `document`.
///
/// A reference to a record elsewhere in the document becomes a copy of it. A
/// reference to one of its own enclosing records would recurse forever, so it
/// becomes an id stub `{"@rid", "@class"}` instead. Unresolvable references,
/// and cycles through lists or other values without an id, become `null`.
pub fn retrocycle(document: Value) -> Value {
	let mut ancestors = Vec::new();
	resolve(&document, &document, &mut Vec::new(), &mut ancestors)
}

fn resolve(
	root: &Value,
	value: &Value,
	path: &mut Vec<Segment>,
	ancestors: &mut Vec<Vec<Segment>>,
) -> Value {
	if let Some(target) = reference(value) {
		let Some(target_path) = parse_path(target) else {
			warn!("kb-graph: malformed reference {target}");
			return Value::Null;
		};
		let Some(found) = lookup(root, &target_path) else {
			warn!("kb-graph: dangling reference {target}");
			return Value::Null;
		};
		if ancestors.contains(&target_path) {
			return stub(found).unwrap_or_else(|| {
				warn!("kb-graph: cyclic reference {target} to a value without {RID}");
				Value::Null
			});
		}
		ancestors.push(target_path.clone());
		let mut target_path = target_path;
		let resolved = resolve(root, found, &mut target_path, ancestors);
		ancestors.pop();
		return resolved;
	}

	match value {
		Value::Object(fields) => {
			ancestors.push(path.clone());
			let mut resolved = Map::with_capacity(fields.len());
			for (key, child) in fields {
				path.push(Segment::Key(key.clone()));
				resolved.insert(key.clone(), resolve(root, child, path, ancestors));
				path.pop();
			}
			ancestors.pop();
			Value::Object(resolved)
		}
		Value::Array(items) => {
			ancestors.push(path.clone());
			let mut resolved = Vec::with_capacity(items.len());
			for (i, child) in items.iter().enumerate() {
				path.push(Segment::Index(i));
				resolved.push(resolve(root, child, path, ancestors));
				path.pop();
			}
			ancestors.pop();
			Value::Array(resolved)
		}
		_ => value.clone(),
	}
}

/// Target path of a `{"$ref": "..."}` object.
fn reference(value: &Value) -> Option<&str> {
	let fields = value.as_object()?;
	if fields.len() != 1 {
		return None;
	}
	fields.get(REF)?.as_str()
}

fn stub(record: &Value) -> Option<Value> {
	let rid = record.get(RID)?;
	Some(json!({ RID: rid, CLASS: record.get(CLASS).cloned().unwrap_or(Value::Null) }))
}

fn lookup<'a>(root: &'a Value, path: &[Segment]) -> Option<&'a Value> {
	path.iter().try_fold(root, |value, segment| match segment {
		Segment::Key(key) => value.get(key.as_str()),
		Segment::Index(i) => value.get(*i),
	})
}

/// Parses `$["key"][0]...` into segments.
fn parse_path(path: &str) -> Option<Vec<Segment>> {
	let mut rest = path.strip_prefix('$')?;
	let mut segments = Vec::new();
	while !rest.is_empty() {
		rest = rest.strip_prefix('[')?;
		if rest.starts_with('"') {
			let end = closing_quote(rest)?;
			let key: String = serde_json::from_str(&rest[..=end]).ok()?;
			segments.push(Segment::Key(key));
			rest = rest[end + 1..].strip_prefix(']')?;
		} else {
			let end = rest.find(']')?;
			segments.push(Segment::Index(rest[..end].parse().ok()?));
			rest = &rest[end + 1..];
		}
	}
	Some(segments)
}

/// Byte offset of the quote closing the JSON string starting at `s[0]`.
fn closing_quote(s: &str) -> Option<usize> {
	let mut escaped = false;
	for (i, c) in s.char_indices().skip(1) {
		match c {
			_ if escaped => escaped = false,
			'\\' => escaped = true,
			'"' => return Some(i),
			_ => {}
		}
	}
	None
}
