//! Process-wide label table for raw input identifiers.
//!
//! The table is installed once at startup and never mutated afterwards; every
//! lookup goes through the same immutable snapshot. Content labels on actions
//! (`Action::content_labels`) resolve through here.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::event::InputId;

struct LabelTable {
    by_id: HashMap<InputId, &'static str>,
    by_name: HashMap<&'static str, InputId>,
}

static TABLE: OnceLock<LabelTable> = OnceLock::new();

/// Install the process-wide label table. Returns `false` (and leaves the
/// existing table untouched) if one was already installed.
pub fn install_labels<I, S>(entries: I) -> bool
where
    I: IntoIterator<Item = (InputId, S)>,
    S: Into<String>,
{
    let mut by_id = HashMap::new();
    let mut by_name = HashMap::new();

    for (id, name) in entries {
        // The table lives for the whole process, so leaking the backing
        // strings is the intended lifetime.
        let name: &'static str = Box::leak(name.into().into_boxed_str());
        by_id.insert(id, name);
        by_name.insert(name, id);
    }

    TABLE.set(LabelTable { by_id, by_name }).is_ok()
}

/// Look up the label for an id.
pub fn label_of(id: InputId) -> Option<&'static str> {
    TABLE.get().and_then(|table| table.by_id.get(&id).copied())
}

/// Look up the id for a label.
pub fn resolve_label(name: &str) -> Option<InputId> {
    TABLE.get().and_then(|table| table.by_name.get(name).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_then_lookup_both_directions() {
        // First install in this process wins; later calls are no-ops.
        install_labels([(InputId(81), "Q"), (InputId(69), "E")]);

        if let Some(label) = label_of(InputId(81)) {
            assert_eq!(label, "Q");
            assert_eq!(resolve_label("Q"), Some(InputId(81)));
        }
        assert_eq!(label_of(InputId(123_456)), None);
        assert_eq!(resolve_label("NoSuchKey"), None);
    }

    #[test]
    fn second_install_is_rejected() {
        install_labels([(InputId(1), "A")]);
        assert!(!install_labels([(InputId(2), "B")]));
    }
}
