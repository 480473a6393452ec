//! Directive line extraction and tokenization.
//!
//! A directive line starts with [`DIRECTIVE_MARKER`]. The marker is removed,
//! everything from the first unescaped [`COMMENT_MARK`] on is discarded and the
//! rest is trimmed. Each cleaned line is split into `flag`/`value` tokens and
//! the tokens of all lines are concatenated in file order.

/// Prefix identifying a directive line.
pub const DIRECTIVE_MARKER: &str = "#SBATCH";

/// Starts an inline comment inside a cleaned directive line.
pub const COMMENT_MARK: char = '#';

/// Returns the cleaned content of `line` if it is a directive line.
///
/// A directive line with nothing left after cleaning yields `Some("")`.
pub fn clean_line(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(DIRECTIVE_MARKER)?;
    Some(strip_comment(rest).trim())
}

/// Cleaned content of every directive line of `script`, in file order.
pub fn directive_lines(script: &str) -> impl Iterator<Item = &str> {
    script.lines().filter_map(clean_line)
}

/// Splits a cleaned directive line into tokens.
///
/// Words are separated by whitespace (quotes group, backslash escapes).
/// An option written as `--flag=value` becomes two tokens, both trimmed.
pub fn split_line(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in split_words(line) {
        if word == "=" {
            continue;
        }
        match word.split_once('=') {
            Some((flag, value)) if flag.starts_with('-') => {
                out.push(flag.trim().to_string());
                let value = value.trim();
                if !value.is_empty() {
                    out.push(value.to_string());
                }
            }
            _ => out.push(word),
        }
    }
    out
}

/// Flat token stream of all directives in `script`.
pub fn tokenize(script: &str) -> Vec<String> {
    directive_lines(script).flat_map(split_line).collect()
}

fn strip_comment(s: &str) -> &str {
    let mut prev = None;
    for (i, ch) in s.char_indices() {
        if ch == COMMENT_MARK && prev != Some('\\') {
            return &s[..i];
        }
        prev = Some(ch);
    }
    s
}

fn split_words(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escape = false;
    // Distinguishes `""` (an explicit empty word) from no word at all.
    let mut quoted = false;

    for ch in input.chars() {
        if escape {
            buf.push(ch);
            escape = false;
            continue;
        }
        if ch == '\\' && !in_single {
            escape = true;
            continue;
        }
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                buf.push(ch);
            }
            continue;
        }
        if in_double {
            if ch == '"' {
                in_double = false;
            } else {
                buf.push(ch);
            }
            continue;
        }
        match ch {
            '\'' => {
                in_single = true;
                quoted = true;
            }
            '"' => {
                in_double = true;
                quoted = true;
            }
            ch if ch.is_whitespace() => {
                if !buf.is_empty() || quoted {
                    out.push(std::mem::take(&mut buf));
                }
                quoted = false;
            }
            _ => buf.push(ch),
        }
    }

    if escape {
        buf.push('\\');
    }
    if !buf.is_empty() || quoted {
        out.push(buf);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_flagged_lines() {
        let script = "#!/bin/bash\n#SBATCH --job-name=a\necho hi\n  #SBATCH --ntasks=2\n#SBATCH -v\n";
        let lines: Vec<_> = directive_lines(script).collect();
        assert_eq!(lines, vec!["--job-name=a", "-v"]);
    }

    #[test]
    fn strips_inline_comments_and_whitespace() {
        assert_eq!(clean_line("#SBATCH   --mem=100  # memory"), Some("--mem=100"));
        assert_eq!(clean_line("#SBATCH#SBATCH"), Some(""));
        assert_eq!(clean_line("#SBATCH"), Some(""));
        assert_eq!(clean_line("# SBATCH --mem=1"), None);
    }

    #[test]
    fn escaped_comment_mark_is_kept() {
        assert_eq!(
            clean_line(r"#SBATCH --comment=run\#1 # note"),
            Some(r"--comment=run\#1")
        );
        assert_eq!(split_line(r"--comment=run\#1"), vec!["--comment", "run#1"]);
    }

    #[test]
    fn splits_on_equals_once() {
        assert_eq!(split_line("--abc=0"), vec!["--abc", "0"]);
        assert_eq!(split_line("--export=A=1,B=2"), vec!["--export", "A=1,B=2"]);
        assert_eq!(split_line("--job-name = name"), vec!["--job-name", "name"]);
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(split_line("-v -J job_name"), vec!["-v", "-J", "job_name"]);
    }

    #[test]
    fn emits_every_pair_on_one_line() {
        assert_eq!(
            split_line("--job-name=a --ntasks 2 -p debug"),
            vec!["--job-name", "a", "--ntasks", "2", "-p", "debug"]
        );
    }

    #[test]
    fn quotes_group_words() {
        assert_eq!(
            split_line(r#"--comment="two words" -J 'x y'"#),
            vec!["--comment", "two words", "-J", "x y"]
        );
    }

    #[test]
    fn empty_directive_yields_no_tokens() {
        assert!(tokenize("#SBATCH\n#SBATCH   # only a comment\n").is_empty());
    }

    #[test]
    fn token_stream_follows_file_order() {
        let script = "#SBATCH -J first\n#SBATCH --ntasks=4\n#SBATCH -J second";
        assert_eq!(
            tokenize(script),
            vec!["-J", "first", "--ntasks", "4", "-J", "second"]
        );
    }
}
