/// Replace `?` placeholders with `$1..$n`.
///
/// Question marks inside single-quoted literals, double-quoted identifiers,
/// `--` line comments and `/* */` block comments are left alone.
/// Returns the rewritten SQL and the number of placeholders found.
pub fn rewrite_placeholders(sql: &str) -> (String, usize) {
    let mut result = String::with_capacity(sql.len() + 8);
    let mut chars = sql.chars().peekable();
    let mut count = 0;

    while let Some(ch) = chars.next() {
        match ch {
            '?' => {
                count += 1;
                result.push('$');
                result.push_str(&count.to_string());
            }
            '\'' | '"' => {
                result.push(ch);
                // a doubled quote closes and reopens, which needs no special case
                for inner in chars.by_ref() {
                    result.push(inner);
                    if inner == ch {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                result.push(ch);
                for inner in chars.by_ref() {
                    result.push(inner);
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                result.push(ch);
                if let Some(star) = chars.next() {
                    result.push(star);
                }
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    result.push(inner);
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            _ => result.push(ch),
        }
    }

    (result, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_in_order() {
        let (sql, n) = rewrite_placeholders("SELECT * FROM users WHERE a = ? AND b IN (?, ?)");
        assert_eq!(sql, "SELECT * FROM users WHERE a = $1 AND b IN ($2, $3)");
        assert_eq!(n, 3);
    }

    #[test]
    fn skips_quoted_text() {
        let (sql, n) = rewrite_placeholders("a = ? AND b = '?'");
        assert_eq!(sql, "a = $1 AND b = '?'");
        assert_eq!(n, 1);

        let (sql, n) = rewrite_placeholders("SELECT \"why?\" FROM t WHERE c = 'it''s ?' AND d = ?");
        assert_eq!(sql, "SELECT \"why?\" FROM t WHERE c = 'it''s ?' AND d = $1");
        assert_eq!(n, 1);
    }

    #[test]
    fn skips_comments() {
        let (sql, n) = rewrite_placeholders("SELECT ? -- really?\nFROM t /* ok? */ WHERE x = ?");
        assert_eq!(sql, "SELECT $1 -- really?\nFROM t /* ok? */ WHERE x = $2");
        assert_eq!(n, 2);
    }

    #[test]
    fn plain_minus_and_slash_are_untouched() {
        let (sql, n) = rewrite_placeholders("SELECT a - ? / 2 FROM t");
        assert_eq!(sql, "SELECT a - $1 / 2 FROM t");
        assert_eq!(n, 1);
    }

    #[test]
    fn unterminated_literal_is_copied_verbatim() {
        let (sql, n) = rewrite_placeholders("a = 'open ?");
        assert_eq!(sql, "a = 'open ?");
        assert_eq!(n, 0);
    }
}
