// file: src/tools/text.rs
// version: 1.0.0
// guid: 6576350e-7e90-4e2a-908e-91472324a97c

//! Console output cleanup shared by the text parsers

/// Strip ANSI escapes and carriage-return redraws from captured console output
///
/// A line redrawn with `\r` keeps only its last non-blank frame, which is what a
/// terminal would have shown. A leading byte-order mark is dropped. Line structure,
/// including blank lines, is preserved.
pub fn clean_terminal_output(input: &str) -> String {
    let input = input.trim_start_matches('\u{feff}');
    let mut stripped = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            '\r' | '\n' | '\t' => stripped.push(c),
            c if c.is_control() => {}
            _ => stripped.push(c),
        }
    }

    stripped
        .split('\n')
        .map(|line| {
            line.split('\r')
                .filter(|frame| !frame.trim().is_empty())
                .last()
                .unwrap_or("")
                .trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
