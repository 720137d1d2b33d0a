/// Escapes `value` for use inside a single-quoted Airtable formula string.
pub fn escape_formula_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A `filterByFormula` expression that matches records whose `field` equals `value` when both are compared as text.
///
/// Concatenating the field with an empty string converts numbers to text, so `"2"` matches a numeric cell holding 2.
pub fn equals_formula(field: &str, value: &str) -> String {
    let field = field.replace('}', "\\}");
    format!("({{{field}}}&'')='{}'", escape_formula_string(value))
}
