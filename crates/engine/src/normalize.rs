use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Canonical form used for all pattern comparisons: case-folded, every
/// non-word character replaced with a space, whitespace collapsed.
pub fn normalize(text: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD.get_or_init(|| Regex::new(r"[^\w\s]").expect("static pattern"));
    let lowered = text.to_lowercase();
    let stripped = re.replace_all(&lowered, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Levenshtein edit distance over characters, using the two-row
/// O(min(m,n)) space algorithm.
fn levenshtein(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    let (m, n) = (a.len(), b.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Keep the shorter string in the inner loop to minimise allocation.
    let (a, b, m, n) = if m <= n { (a, b, m, n) } else { (b, a, n, m) };

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Similarity in [0, 100]. Integer arithmetic before the final division so
/// round distances produce exact scores (distance 1 over length 10 is
/// exactly 90.0).
fn ratio(s1: &str, s2: &str) -> f32 {
    let max_len = s1.chars().count().max(s2.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    let dist = levenshtein(s1, s2);
    ((max_len - dist) * 100) as f32 / max_len as f32
}

/// Token-set similarity in [0, 100]: compares the sorted token
/// intersection against each side's intersection + difference, so a
/// description whose tokens are a subset of a pattern's scores 100
/// regardless of word order or duplication.
pub fn token_set_ratio(s1: &str, s2: &str) -> f32 {
    let tokens1: BTreeSet<&str> = s1.split_whitespace().collect();
    let tokens2: BTreeSet<&str> = s2.split_whitespace().collect();

    if tokens1.is_empty() && tokens2.is_empty() {
        return 100.0;
    }
    if tokens1.is_empty() || tokens2.is_empty() {
        return 0.0;
    }

    let inter: Vec<&str> = tokens1.intersection(&tokens2).copied().collect();
    let diff1: Vec<&str> = tokens1.difference(&tokens2).copied().collect();
    let diff2: Vec<&str> = tokens2.difference(&tokens1).copied().collect();

    let base = inter.join(" ");
    let combined1 = join_parts(&base, &diff1);
    let combined2 = join_parts(&base, &diff2);

    ratio(&base, &combined1)
        .max(ratio(&base, &combined2))
        .max(ratio(&combined1, &combined2))
}

fn join_parts(base: &str, diff: &[&str]) -> String {
    if diff.is_empty() {
        base.to_string()
    } else if base.is_empty() {
        diff.join(" ")
    } else {
        format!("{base} {}", diff.join(" "))
    }
}
