use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::constants::sampler::{NEGATIVE_LABEL, POSITIVE_LABEL};

pub use crate::types::{ClassId, Code, FlatLine, FuncId, LineRange};

/// One function snippet inside a clone group.
///
/// Missing text fields load as empty strings and are left out again when written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireRecord", into = "WireRecord")]
pub struct FunctionRecord {
    /// Source file the snippet was extracted from.
    pub file: String,
    /// Line range within `file` (numbers are accepted and kept as text).
    pub range: LineRange,
    /// Number of lines reported by the clone detector, when present and numeric.
    pub nlines: Option<u64>,
    /// Fully qualified function name.
    pub qualified_name: String,
    /// Snippet text.
    pub code: Code,
    /// Globally unique id, absent until ids are assigned.
    pub func_id: Option<FuncId>,
    /// Fields not modeled explicitly (for example `pcid`); preserved on output.
    pub extra: Map<String, Value>,
    range_form: ScalarForm,
}

impl FunctionRecord {
    /// Assigned id, treating an empty string as unassigned.
    pub fn func_id(&self) -> Option<&str> {
        self.func_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Fallback identity used when no func id is available.
    pub fn location_key(&self) -> String {
        format!("{}{}", self.qualified_name, self.range)
    }
}

/// A set of snippets known to be mutual clones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireGroup", into = "WireGroup")]
pub struct CloneGroup {
    /// Group identifier; numeric ids are held as text and written back as numbers.
    pub classid: ClassId,
    /// Clone count; normalized to `sources.len()` on load and after filtering.
    pub nclones: usize,
    /// Detector-reported similarity for the group, when present and numeric.
    pub similarity: Option<f64>,
    /// Member snippets in input order.
    pub sources: Vec<FunctionRecord>,
    /// Fields not modeled explicitly; preserved on output.
    pub extra: Map<String, Value>,
    classid_form: ScalarForm,
}

impl CloneGroup {
    /// Build a group from sources, with `nclones` in sync.
    pub fn new(classid: impl Into<ClassId>, sources: Vec<FunctionRecord>) -> Self {
        Self {
            classid: classid.into(),
            nclones: sources.len(),
            similarity: None,
            sources,
            extra: Map::new(),
            classid_form: ScalarForm::Text,
        }
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True when the group has no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Whether a text-held field arrived as a JSON number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ScalarForm {
    #[default]
    Text,
    Number,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(Number),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> (String, ScalarForm) {
        match self {
            Scalar::Number(number) => (number.to_string(), ScalarForm::Number),
            Scalar::Text(text) => (text, ScalarForm::Text),
        }
    }

    fn from_text(text: String, form: ScalarForm) -> Self {
        match form {
            ScalarForm::Number => text
                .parse::<Number>()
                .map(Scalar::Number)
                .unwrap_or(Scalar::Text(text)),
            ScalarForm::Text => Scalar::Text(text),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<Scalar>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_count"
    )]
    nlines: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    func_id: Option<FuncId>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<WireRecord> for FunctionRecord {
    fn from(wire: WireRecord) -> Self {
        let (range, range_form) = wire
            .range
            .map(Scalar::into_text)
            .unwrap_or_default();
        Self {
            file: wire.file.unwrap_or_default(),
            range,
            nlines: wire.nlines,
            qualified_name: wire.qualified_name.unwrap_or_default(),
            code: wire.code.unwrap_or_default(),
            func_id: wire.func_id,
            extra: wire.extra,
            range_form,
        }
    }
}

impl From<FunctionRecord> for WireRecord {
    fn from(record: FunctionRecord) -> Self {
        Self {
            file: non_empty(record.file),
            range: non_empty(record.range).map(|range| Scalar::from_text(range, record.range_form)),
            nlines: record.nlines,
            qualified_name: non_empty(record.qualified_name),
            code: non_empty(record.code),
            func_id: record.func_id,
            extra: record.extra,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireGroup {
    classid: Scalar,
    #[serde(default, deserialize_with = "lenient_count")]
    nclones: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_ratio"
    )]
    similarity: Option<Number>,
    #[serde(default)]
    sources: Vec<FunctionRecord>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<WireGroup> for CloneGroup {
    fn from(wire: WireGroup) -> Self {
        let (classid, classid_form) = wire.classid.into_text();
        Self {
            classid,
            nclones: wire
                .nclones
                .and_then(|count| usize::try_from(count).ok())
                .unwrap_or_default(),
            similarity: wire.similarity.and_then(|number| number.as_f64()),
            sources: wire.sources,
            extra: wire.extra,
            classid_form,
        }
    }
}

impl From<CloneGroup> for WireGroup {
    fn from(group: CloneGroup) -> Self {
        Self {
            classid: Scalar::from_text(group.classid, group.classid_form),
            nclones: Some(group.nclones as u64),
            similarity: group.similarity.and_then(ratio_number),
            sources: group.sources,
            extra: group.extra,
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Whole ratios are written as integers so `80` stays `80`.
fn ratio_number(value: f64) -> Option<Number> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Some(Number::from(value as i64));
    }
    Number::from_f64(value)
}

/// Pair label for supervised pair datasets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PairLabel {
    /// Functions from different clone groups (`0`).
    Negative,
    /// Functions from the same clone group (`1`).
    Positive,
}

impl PairLabel {
    /// Label text used in flat pair files.
    pub fn as_flat(self) -> &'static str {
        match self {
            PairLabel::Negative => NEGATIVE_LABEL,
            PairLabel::Positive => POSITIVE_LABEL,
        }
    }

    /// Parse a flat-file label field.
    pub fn from_flat(raw: &str) -> Option<Self> {
        match raw {
            NEGATIVE_LABEL => Some(PairLabel::Negative),
            POSITIVE_LABEL => Some(PairLabel::Positive),
            _ => None,
        }
    }
}

impl From<PairLabel> for u8 {
    fn from(label: PairLabel) -> Self {
        match label {
            PairLabel::Negative => 0,
            PairLabel::Positive => 1,
        }
    }
}

impl TryFrom<u8> for PairLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PairLabel::Negative),
            1 => Ok(PairLabel::Positive),
            other => Err(format!("pair label must be 0 or 1, found {other}")),
        }
    }
}

/// Group identifiers attached to an emitted pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PairMeta {
    /// Members come from two different groups.
    Cross {
        /// Group of `func1`.
        classid1: ClassId,
        /// Group of `func2`.
        classid2: ClassId,
    },
    /// Both members share one group.
    Same {
        /// The shared group.
        classid: ClassId,
    },
}

/// Labeled function pair. Unordered: `(a, b)` and `(b, a)` are the same pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    /// `1` for same group, `0` otherwise.
    pub label: PairLabel,
    /// First member.
    pub func1: FunctionRecord,
    /// Second member.
    pub func2: FunctionRecord,
    /// Source group ids.
    pub meta: PairMeta,
}

impl Pair {
    pub(crate) fn positive(classid: &ClassId, a: &FunctionRecord, b: &FunctionRecord) -> Self {
        Self {
            label: PairLabel::Positive,
            func1: a.clone(),
            func2: b.clone(),
            meta: PairMeta::Same {
                classid: classid.clone(),
            },
        }
    }

    pub(crate) fn negative(
        classid1: &ClassId,
        a: &FunctionRecord,
        classid2: &ClassId,
        b: &FunctionRecord,
    ) -> Self {
        Self {
            label: PairLabel::Negative,
            func1: a.clone(),
            func2: b.clone(),
            meta: PairMeta::Cross {
                classid1: classid1.clone(),
                classid2: classid2.clone(),
            },
        }
    }

    /// `func_id1<TAB>func_id2<TAB>label`, or `None` when either id is missing.
    pub fn flat_line(&self) -> Option<FlatLine> {
        let first = self.func1.func_id()?;
        let second = self.func2.func_id()?;
        Some(format!("{first}\t{second}\t{}", self.label.as_flat()))
    }
}

/// Function export row consumed by downstream training code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    /// Source text.
    pub func: Code,
    /// Assigned function id.
    pub idx: FuncId,
}

/// Counts given as numbers or numeric strings; anything else reads as absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.is_finite() && *value >= 0.0)
                .map(|value| value as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    })
}

fn lenient_ratio<'de, D>(deserializer: D) -> Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => Some(number),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64),
        _ => None,
    })
}
