use serde_json::{Map, Value};

/// Additive diff: keys of `new` that are missing from `old` or differ from
/// it. Nested objects produce nested sub-patches. Deletions are not
/// represented. Returns `None` when nothing changed.
pub fn diff(new: &Value, old: &Value) -> Option<Value> {
    match (new, old) {
        (Value::Object(new), Value::Object(old)) => {
            let mut out = Map::new();
            for (key, value) in new {
                let changed = match old.get(key) {
                    Some(prev) => diff(value, prev),
                    None => Some(value.clone()),
                };
                if let Some(changed) = changed {
                    out.insert(key.clone(), changed);
                }
            }
            (!out.is_empty()).then_some(Value::Object(out))
        }
        _ if new == old => None,
        _ => Some(new.clone()),
    }
}

/// Applies a patch the way consumers do: objects merge key-wise, every other
/// value replaces what was there.
pub fn apply_patch(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                let nested = value.is_object() && base.get(key).is_some_and(Value::is_object);
                if !nested {
                    base.insert(key.clone(), value.clone());
                } else if let Some(existing) = base.get_mut(key) {
                    apply_patch(existing, value);
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}
