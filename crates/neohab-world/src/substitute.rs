//! State substitution for outbound commands.
//!
//! A command field may reference live world state with `$` paths:
//!
//! ```text
//! "$ME.mods.noid"        → 42            (the value itself, type kept)
//! "hello $ME.name!"      → "hello Randy!" (text, concatenated)
//! "$USER"                → "user-randy"  (alias value, no object behind it)
//! ```
//!
//! A path's first segment is an alias. Each further segment is looked up,
//! in order, in the object's first mod, then in the object itself, then in
//! whatever the previous segment produced.

use neohab_protocol::Command;
use serde_json::Value;

use crate::Mirror;

/// Resolves `to` through the alias table, then substitutes every string
/// field that contains a `$`.
pub(crate) fn prepare(mirror: &Mirror, cmd: &mut Command) {
    let fields = cmd.fields_mut();

    if let Some(Value::String(to)) = fields.get_mut("to") {
        if let Some(reference) = mirror.resolve(to) {
            *to = reference.to_owned();
        }
    }

    for (key, value) in fields.iter_mut() {
        let Value::String(text) = value else {
            continue;
        };
        if !text.contains('$') {
            continue;
        }
        let replacement = substitute(mirror, text);
        tracing::trace!(field = %key, %replacement, "substituted");
        *value = replacement;
    }
}

/// Substitutes every `$` path in `text`.
///
/// If `text` is exactly one path with no surrounding literal text, the
/// resolved value is returned as-is; otherwise the result is a string.
pub fn substitute(mirror: &Mirror, text: &str) -> Value {
    let mut chunks = text.split('$');
    let prefix = chunks.next().unwrap_or_default();
    let rest: Vec<&str> = chunks.collect();

    if let ([only], true) = (rest.as_slice(), prefix.is_empty()) {
        let (path, suffix) = split_path(only);
        if !path.is_empty() && suffix.is_empty() {
            return resolve_path(mirror, path);
        }
    }

    let mut out = String::from(prefix);
    for chunk in rest {
        let (path, suffix) = split_path(chunk);
        if path.is_empty() {
            out.push('$');
            out.push_str(chunk);
            continue;
        }
        push_text(&mut out, &resolve_path(mirror, path));
        out.push_str(suffix);
    }
    Value::String(out)
}

/// Splits a chunk into its leading dotted path and the literal remainder.
fn split_path(chunk: &str) -> (&str, &str) {
    let end = chunk
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        .map_or(chunk.len(), |(i, _)| i);
    let path = chunk[..end].trim_end_matches('.');
    (path, &chunk[path.len()..])
}

fn resolve_path(mirror: &Mirror, path: &str) -> Value {
    let mut segments = path.split('.');
    let head = segments.next().unwrap_or_default();

    let Some(record) = mirror.object(head) else {
        // No object behind the alias: the alias value (or the text itself)
        // stands in.
        let literal = mirror.resolve(head).unwrap_or(head);
        return Value::String(literal.to_owned());
    };

    let rest: Vec<&str> = segments.collect();
    if rest.is_empty() {
        return Value::String(record.reference.clone());
    }

    let whole = match serde_json::to_value(record) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(%path, error = %e, "could not flatten record");
            return Value::Null;
        }
    };
    let first_mod = record.first_mod();

    let mut current = whole.clone();
    for segment in rest {
        current = first_mod
            .and_then(|m| m.get(segment))
            .or_else(|| whole.get(segment))
            .or_else(|| step(&current, segment))
            .cloned()
            .unwrap_or_else(|| {
                tracing::debug!(%path, segment, "unresolved substitution segment");
                Value::Null
            });
    }
    current
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn push_text(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Null => {}
        other => out.push_str(&other.to_string()),
    }
}
