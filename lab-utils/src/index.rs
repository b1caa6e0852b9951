use anyhow::{anyhow, Result};

/// Parses a list of natural numbers such as `"[0, 2:4, 7]"` where `a:b` is an
/// inclusive range. An empty list selects every number in `min..=max`.
pub fn parse_natural_index(line: &str, min: usize, max: usize) -> Result<Vec<usize>> {
    let line = line.trim();
    let line = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(line)
        .trim();

    if line.is_empty() {
        return Ok((min..=max).collect());
    }

    let mut index = Vec::new();
    for chunk in line.split(',') {
        let chunk = chunk.trim();
        let (from, to) = match chunk.split_once(':') {
            Some((from, to)) => (parse_number(from)?, parse_number(to)?),
            None => {
                let number = parse_number(chunk)?;
                (number, number)
            }
        };
        if from > to {
            return Err(anyhow!("Range '{}' is decreasing", chunk));
        }
        if from < min || to > max {
            return Err(anyhow!(
                "Range '{}' is outside of the interval [{}, {}]",
                chunk,
                min,
                max
            ));
        }
        index.extend(from..=to);
    }

    Ok(index)
}

fn parse_number(input: &str) -> Result<usize> {
    input
        .trim()
        .parse::<usize>()
        .map_err(|_| anyhow!("'{}' is not a natural number", input.trim()))
}
