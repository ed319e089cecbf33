use anyhow::{Context, Result, bail};
use std::collections::HashSet;

const DEFAULT_SEED: u64 = 1337;
const MAX_RANGE_LEN: u64 = 10_000;

/// Resolve CLI seed tokens into a deduplicated, ordered seed list.
///
/// Accepts literal integers (negative values use their magnitude) and
/// inclusive ranges such as `10..20`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut pending = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if let Some((start, end)) = token.split_once("..") {
            let start: u64 = start
                .parse()
                .with_context(|| format!("bad range start in {token}"))?;
            let end: u64 = end
                .parse()
                .with_context(|| format!("bad range end in {token}"))?;
            if end < start {
                bail!("Seed range {token} runs backwards");
            }
            if end - start >= MAX_RANGE_LEN {
                bail!("Seed range {token} exceeds {MAX_RANGE_LEN} seeds");
            }
            pending.extend(start..=end);
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            pending.push(value.unsigned_abs());
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            pending.push(value);
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    let mut seen = HashSet::new();
    pending.retain(|seed| seen.insert(*seed));

    if pending.is_empty() {
        pending.push(DEFAULT_SEED);
    }

    Ok(pending)
}
