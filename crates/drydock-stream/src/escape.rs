//! Control-character escape decoding for the event-stream transport.
//!
//! That transport delivers carriage returns and line feeds as literal
//! two-character escapes (`\r`, `\n` as text); the chunked transport already
//! carries real control characters and never goes through this module.

/// Decode literal `\r`/`\n` escapes into real CR/LF.
///
/// Returns the decoded text plus a flag indicating the input ended in a lone
/// backslash that may be the first half of an escape split across fragments.
/// The caller holds that backslash back and prepends it to the next fragment.
///
/// A backslash followed by anything other than `r` or `n` is passed through
/// literally; free-form log content must never be mangled.
pub fn decode_control_escapes(input: &str) -> (String, bool) {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('r') => {
                chars.next();
                out.push('\r');
            }
            Some(_) => out.push('\\'),
            // Trailing backslash: possibly a split escape
            None => return (out, true),
        }
    }

    (out, false)
}
