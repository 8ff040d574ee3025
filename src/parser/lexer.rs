//! G-code lexer
//!
//! Splits one line into command, parameter and comment tokens. Tokens borrow
//! from the line, nothing is allocated besides the token vector.

/// Token types in G-code
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    /// Command like "G1", "M104"
    Command,
    /// Parameter like "X10", "S255"
    Parameter,
    /// Comment (semicolon or parenthetical), delimiters included
    Comment,
}

/// A token borrowing its text from the source line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Tokenize a line of G-code.
///
/// Only the first word starting with G, M or T is a command; later words
/// are parameters even when they start with one of those letters.
pub fn tokenize_line(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::with_capacity(8);
    let mut seen_command = false;
    let mut chars = line.char_indices().peekable();

    while let Some((start_idx, ch)) = chars.next() {
        match ch {
            ' ' | '\t' | '\r' | '\n' => continue,

            // Semicolon comment: rest of line
            ';' => {
                tokens.push(Token {
                    kind: TokenKind::Comment,
                    text: &line[start_idx..],
                });
                break;
            }

            '(' => {
                let mut end_idx = line.len();
                for (idx, c) in chars.by_ref() {
                    if c == ')' {
                        end_idx = idx + 1;
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Comment,
                    text: &line[start_idx..end_idx],
                });
            }

            c if c.is_ascii_alphabetic() => {
                let mut end_idx = start_idx + 1;
                while let Some(&(idx, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || matches!(next, '.' | '-' | '+') {
                        end_idx = idx + 1;
                        chars.next();
                    } else {
                        break;
                    }
                }

                let text = &line[start_idx..end_idx];
                let kind = if !seen_command && is_command(text) {
                    seen_command = true;
                    TokenKind::Command
                } else {
                    TokenKind::Parameter
                };
                tokens.push(Token { kind, text });
            }

            // malformed input
            _ => continue,
        }
    }

    tokens
}

fn is_command(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(
        chars.next().map(|c| c.to_ascii_uppercase()),
        Some('G' | 'M' | 'T')
    ) && chars.next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple_command() {
        let tokens = tokenize_line("G1 X10 Y20");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Command);
        assert_eq!(tokens[0].text, "G1");
        assert_eq!(tokens[1].kind, TokenKind::Parameter);
        assert_eq!(tokens[1].text, "X10");
        assert_eq!(tokens[2].text, "Y20");
    }

    #[test]
    fn test_tokenize_with_semicolon_comment() {
        let tokens = tokenize_line("G1 X10 ; move to X10");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::Comment);
        assert_eq!(tokens[2].text, "; move to X10");
    }

    #[test]
    fn test_tokenize_paren_comment() {
        let tokens = tokenize_line("G1 (rapid move) X10");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].text, "(rapid move)");
    }

    #[test]
    fn test_tokenize_empty_line() {
        assert!(tokenize_line("   ").is_empty());
    }

    #[test]
    fn test_tool_parameter_is_not_a_command() {
        let tokens = tokenize_line("M104 S210 T1");
        assert_eq!(tokens[0].kind, TokenKind::Command);
        assert_eq!(tokens[2].kind, TokenKind::Parameter);
        assert_eq!(tokens[2].text, "T1");
    }

    #[test]
    fn test_signed_parameters() {
        let tokens = tokenize_line("G1 X10.5 Y-2.3 E+1.0");
        assert_eq!(tokens[2].text, "Y-2.3");
        assert_eq!(tokens[3].text, "E+1.0");
    }
}
