//! Read-only entry views and modification descriptions.
//!
//! Entries are owned by the storage layer; the index engine only ever sees
//! immutable before/after snapshots of an entry per mutation.

use ahash::AHashMap;

/// Stable identifier of a directory entry, valid for the entry's lifetime.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub u64);

/// A read-only view of one directory entry: its identifier and a mapping
/// from attribute name to an ordered list of raw values.
#[derive(Debug, Clone)]
pub struct Entry {
    id: EntryId,
    attributes: AHashMap<String, Vec<Box<[u8]>>>,
}

impl Entry {
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            attributes: AHashMap::new(),
        }
    }

    /// Builder-style attribute population, mainly for construction by the
    /// storage layer and tests.
    pub fn with_attribute<I, V>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        self.set_attribute(attribute, values);
        self
    }

    pub fn set_attribute<I, V>(&mut self, attribute: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let attribute = attribute.into();
        let values: Vec<Box<[u8]>> = values
            .into_iter()
            .map(|value| value.as_ref().to_vec().into_boxed_slice())
            .collect();
        if values.is_empty() {
            self.attributes.remove(&attribute);
        } else {
            self.attributes.insert(attribute, values);
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The raw values of an attribute, in storage order. Absent attributes
    /// yield an empty slice.
    pub fn attribute_values(&self, attribute: &str) -> &[Box<[u8]>] {
        self.attributes
            .get(attribute)
            .map_or(&[], |values| values.as_slice())
    }

    /// Whether the attribute has at least one value on this entry.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        !self.attribute_values(attribute).is_empty()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Produces the entry that results from applying a modification
    /// sequence to this one. Values compare by raw bytes.
    pub fn apply(&self, modifications: &[Modification]) -> Entry {
        let mut next = self.clone();
        for modification in modifications {
            let attribute = modification.attribute.as_str();
            match modification.op {
                ModificationOp::Add => {
                    let values = next.attributes.entry(attribute.to_string()).or_default();
                    for value in &modification.values {
                        if !values.contains(value) {
                            values.push(value.clone());
                        }
                    }
                }
                ModificationOp::Delete => {
                    if modification.values.is_empty() {
                        next.attributes.remove(attribute);
                    } else if let Some(values) = next.attributes.get_mut(attribute) {
                        values.retain(|value| !modification.values.contains(value));
                        if values.is_empty() {
                            next.attributes.remove(attribute);
                        }
                    }
                }
                ModificationOp::Replace => {
                    if modification.values.is_empty() {
                        next.attributes.remove(attribute);
                    } else {
                        next.attributes
                            .insert(attribute.to_string(), modification.values.clone());
                    }
                }
            }
        }
        next
    }
}

/// The kind of change a single modification applies to one attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModificationOp {
    Add,
    Delete,
    Replace,
}

/// One applied modification of an entry mutation.
///
/// The index engine receives the modification list for interface fidelity
/// with the storage layer, but diffs the before/after snapshots instead of
/// interpreting individual operations; the net key change is identical.
#[derive(Debug, Clone)]
pub struct Modification {
    pub op: ModificationOp,
    pub attribute: String,
    pub values: Vec<Box<[u8]>>,
}

impl Modification {
    pub fn new<I, V>(op: ModificationOp, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        Self {
            op,
            attribute: attribute.into(),
            values: values
                .into_iter()
                .map(|value| value.as_ref().to_vec().into_boxed_slice())
                .collect(),
        }
    }
}
