use std::fmt::Display;
use std::hash::{Hash, Hasher};

/// A domain name as an ordered list of labels, root last. Labels keep the
/// case they arrived with; comparisons ignore ASCII case.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct LabelString(Vec<String>);

pub fn labels_equal(lhs: &LabelString, rhs: &LabelString) -> bool {
    if lhs.len() != rhs.len() {
        return false;
    }

    for (label1, label2) in lhs.as_slice().iter().zip(rhs.as_slice().iter()) {
        if !label1.eq_ignore_ascii_case(label2) {
            return false;
        }
    }

    true
}

impl LabelString {
    pub fn from(string: &str) -> Self {
        let mut labels: Vec<String> = string.split('.').map(str::to_string).collect();
        // "example.com." and "example.com" name the same thing; "" is the root
        while labels.last().is_some_and(|label| label.is_empty()) {
            labels.pop();
        }
        LabelString(labels)
    }

    pub fn as_slice(&self) -> &[String] {
        self.0.as_slice()
    }

    pub fn to_vec(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the wire encoding: one length octet per label plus the
    /// label bytes, plus the terminating zero octet.
    pub fn wire_len(&self) -> usize {
        self.0.iter().map(|label| 1 + label.len()).sum::<usize>() + 1
    }

    /// Lowercased dotted form, used wherever a case-folded key is needed.
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|label| label.to_ascii_lowercase())
            .collect::<Vec<String>>()
            .join(".")
    }
}

impl PartialEq for LabelString {
    fn eq(&self, other: &Self) -> bool {
        labels_equal(self, other)
    }
}

impl Eq for LabelString {}

impl Hash for LabelString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in &self.0 {
            for byte in label.as_bytes() {
                state.write_u8(byte.to_ascii_lowercase());
            }
            state.write_u8(b'.');
        }
    }
}

impl From<&[String]> for LabelString {
    fn from(value: &[String]) -> Self {
        LabelString(value.to_vec())
    }
}

impl From<Vec<String>> for LabelString {
    fn from(value: Vec<String>) -> Self {
        LabelString(value)
    }
}

impl Display for LabelString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
