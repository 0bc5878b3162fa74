use thiserror::Error;

use super::StackSample;

#[derive(Debug, Error)]
pub enum CollapsedParseError {
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("no valid stack lines found")]
    Empty,
}

/// Parse Brendan Gregg's collapsed/folded stack format.
///
/// Each line is `frame;frame;... count`, outermost frame first. The count is
/// the last whitespace-separated token and defaults to 1 when missing or not a
/// number. Blank lines and `#` comments are skipped.
///
/// Used by: `perf script | stackcollapse-perf.pl`, dtrace, FlameGraph tools.
pub fn parse_collapsed(data: &[u8]) -> Result<Vec<StackSample>, CollapsedParseError> {
    let text = std::str::from_utf8(data)?;
    let mut samples = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // "a;b;c 42" -> ("a;b;c", 42). A trailing token that is not a number
        // belongs to the stack.
        let (stack, weight) = match line.rsplit_once(char::is_whitespace) {
            Some((stack, count)) => match count.parse::<f64>() {
                Ok(w) if w.is_finite() && w >= 0.0 => (stack.trim(), w),
                Ok(_) => (stack.trim(), 1.0),
                Err(_) => (line, 1.0),
            },
            None => (line, 1.0),
        };

        let frames: Vec<&str> = stack
            .split(';')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();
        if frames.is_empty() {
            continue;
        }
        samples.push(StackSample::new(frames, weight));
    }

    if samples.is_empty() {
        return Err(CollapsedParseError::Empty);
    }
    tracing::debug!(samples = samples.len(), "parsed folded stacks");
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_collapsed() {
        let input = b"main;foo;bar 10\nmain;foo;baz 20\nmain;qux 5\n";
        let samples = parse_collapsed(input).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], StackSample::new(["main", "foo", "bar"], 10.0));
        assert_eq!(samples.iter().map(|s| s.weight).sum::<f64>(), 35.0);
    }

    #[test]
    fn skips_comments_and_empty_lines() {
        let input = b"# comment\n\nmain;foo 5\n";
        let samples = parse_collapsed(input).unwrap();
        assert_eq!(samples, vec![StackSample::new(["main", "foo"], 5.0)]);
    }

    #[test]
    fn missing_count_defaults_to_one() {
        let samples = parse_collapsed(b"main;foo\nmain;bar x\n").unwrap();
        assert_eq!(samples[0], StackSample::new(["main", "foo"], 1.0));
        assert_eq!(samples[1].weight, 1.0);
        assert_eq!(samples[1].frames[1], "bar x");
    }

    #[test]
    fn frames_may_contain_spaces() {
        let samples = parse_collapsed(b"main;operator new(unsigned long) 3\n").unwrap();
        assert_eq!(
            samples[0],
            StackSample::new(["main", "operator new(unsigned long)"], 3.0)
        );
    }

    #[test]
    fn empty_input_errors() {
        assert!(matches!(parse_collapsed(b""), Err(CollapsedParseError::Empty)));
        assert!(matches!(parse_collapsed(b"# only\n"), Err(CollapsedParseError::Empty)));
    }
}
