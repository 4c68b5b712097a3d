// Key pattern matching for the in memory backend's scan.
//
// Supports `*`, `?` and backslash escapes, the subset of key-pattern syntax the
// namespace key scheme produces.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlobToken {
    Any,
    One,
    Literal(char),
}

fn tokenize(pattern: &str) -> Vec<GlobToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' => GlobToken::Any,
            '?' => GlobToken::One,
            '\\' => GlobToken::Literal(chars.next().unwrap_or('\\')),
            other => GlobToken::Literal(other),
        });
    }
    tokens
}

/// Whether `key` matches the glob `pattern`.
pub fn glob_matches(pattern: &str, key: &str) -> bool {
    let tokens = tokenize(pattern);
    let key: Vec<char> = key.chars().collect();
    let (mut p, mut k) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match tokens.get(p) {
            Some(GlobToken::One) => {
                p += 1;
                k += 1;
            }
            Some(GlobToken::Literal(c)) if *c == key[k] => {
                p += 1;
                k += 1;
            }
            Some(GlobToken::Any) => {
                backtrack = Some((p, k));
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    k = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|token| *token == GlobToken::Any)
}
