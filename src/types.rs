/// Clone group identifier (stable across runs, kept as text even when the input uses numbers).
/// Examples: `1`, `42`, `camel-17`
pub type ClassId = String;
/// Globally unique function identifier in `{classid}_{globalIndex}` form.
/// Examples: `1_0`, `2_3`, `17_1042`
pub type FuncId = String;
/// One side of a canonical pair key: a `FuncId`, or `qualified_name + range` as fallback.
/// Examples: `1_0`, `org.apache.camel.Foo.bar10-25`
pub type PairKeyPart = String;
/// Source line range of a function as reported by the clone detector.
/// Example: `120-148`
pub type LineRange = String;
/// Raw snippet text.
/// Example: `public int size() { return count; }`
pub type Code = String;
/// Single lexical token, before or after normalization.
/// Examples: `return`, `ID`, `NUM`, `&&`
pub type TokenText = String;
/// Line of a flat pair file.
/// Example: `1_0\t1_1\t1`
pub type FlatLine = String;
