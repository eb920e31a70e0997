//! `{name}` placeholder substitution for prompt templates.

/// Replace each `{name}` in `template` with its value from `vars`.
///
/// Substitution is a single left-to-right pass: inserted values are never re-scanned, so a
/// document containing `{question}` cannot inject into the template. Unknown placeholders and
/// unmatched braces are kept verbatim.
#[must_use]
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        if let Some((_, value)) = vars.iter().find(|(k, _)| *k == name) {
            out.push_str(value);
            rest = &after[close + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}
