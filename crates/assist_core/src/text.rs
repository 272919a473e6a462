/// Canonical form used everywhere text is compared: lowercase, letters and
/// digits only, single spaces between tokens, no surrounding whitespace.
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for c in input.chars() {
        if c.is_whitespace() {
            if !out.is_empty() {
                pending_space = true;
            }
        } else if c.is_alphanumeric() {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        }
        // punctuation and symbols are dropped without leaving a space,
        // so "can't" becomes "cant", not "can t"
    }

    out
}
