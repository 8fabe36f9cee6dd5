use crate::constants::{NAMED_SIGIL, VALUE_TEMPLATE_SLOT};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

/// Placeholder generator and value map shared by every node of one criteria tree.
///
/// Tokens have the form `:{prefix}{n}` where `n` comes from a single monotonically
/// increasing sequence, so two tokens minted from the same allocator never collide
/// regardless of which node asked for them.
#[derive(Debug)]
pub struct ParameterAllocator {
    prefix: String,
    state: Mutex<AllocatorState>,
}

#[derive(Debug, Default)]
struct AllocatorState {
    sequence: u64,
    values: IndexMap<String, Value>,
}

impl ParameterAllocator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            state: Mutex::new(AllocatorState::default()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Store `value` under a fresh name and return its token, wrapped in `template`
    /// when one is given (`{0}` marks where the token goes).
    pub fn allocate(&self, template: Option<&str>, value: Value) -> String {
        let name = {
            let mut state = self.state.lock();
            state.sequence += 1;
            let name = format!("{}{}", self.prefix, state.sequence);
            state.values.insert(name.clone(), value);
            name
        };
        apply_template(template, &format!("{NAMED_SIGIL}{name}"))
    }

    pub fn allocate_many<I>(&self, template: Option<&str>, values: I) -> Vec<String>
    where
        I: IntoIterator<Item = Value>,
    {
        values
            .into_iter()
            .map(|value| self.allocate(template, value))
            .collect()
    }

    pub fn allocate_named(
        &self,
        template: Option<&str>,
        values: IndexMap<String, Value>,
    ) -> IndexMap<String, String> {
        values
            .into_iter()
            .map(|(key, value)| (key, self.allocate(template, value)))
            .collect()
    }

    /// Last sequence number handed out
    pub fn sequence(&self) -> u64 {
        self.state.lock().sequence
    }

    pub fn len(&self) -> usize {
        self.state.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().values.is_empty()
    }

    /// Look up a value by name, with or without the leading sigil
    pub fn value(&self, name: &str) -> Option<Value> {
        let name = name.strip_prefix(NAMED_SIGIL).unwrap_or(name);
        self.state.lock().values.get(name).cloned()
    }

    /// Insertion-ordered copy of every bound value
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.state.lock().values.clone()
    }
}

fn apply_template(template: Option<&str>, token: &str) -> String {
    match template {
        Some(template) if template.contains(VALUE_TEMPLATE_SLOT) => {
            template.replace(VALUE_TEMPLATE_SLOT, token)
        }
        _ => token.to_string(),
    }
}
