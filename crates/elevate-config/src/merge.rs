//! Deep merge of raw TOML trees.
//!
//! Layers are merged as [`toml::Value`]s before deserialization, so a key
//! that is absent from an overlay never resets the value below it.

/// Recursively merge `overlay` into `base`.
///
/// Tables merge key by key. Scalars and arrays from the overlay replace the
/// base value, so a `[[policy.rules]]` list in a higher layer replaces the
/// whole rule set rather than extending it.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                    },
                }
            }
        },
        (base, overlay) => *base = overlay.clone(),
    }
}
