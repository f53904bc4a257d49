//! "Did you mean" hints for misspelled field names.
//!
//! Distance is optimal string alignment: Levenshtein plus swapping two
//! adjacent characters as a single edit, so `lables` is one edit from `labels`.

/// Closest candidate to `input`, ignoring ASCII case.
///
/// `None` when `input` already names a candidate, or when the best candidate
/// needs more edits than half the longer of the two names. Ties go to the
/// candidate listed first.
pub(crate) fn closest_field<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let needle = input.to_ascii_lowercase();
    let mut best: Option<(&'a str, usize)> = None;

    for &candidate in candidates {
        let distance = edit_distance(&needle, &candidate.to_ascii_lowercase());
        if distance == 0 {
            return None;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }

    best.filter(|(candidate, distance)| {
        2 * distance <= needle.chars().count().max(candidate.chars().count())
    })
    .map(|(candidate, _)| candidate)
}

/// Optimal string alignment distance between `a` and `b`.
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let width = b.len() + 1;
    let at = |i: usize, j: usize| i * width + j;

    let mut table = vec![0usize; (a.len() + 1) * width];
    for i in 0..=a.len() {
        table[at(i, 0)] = i;
    }
    for j in 0..=b.len() {
        table[at(0, j)] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let substitution = table[at(i - 1, j - 1)] + usize::from(a[i - 1] != b[j - 1]);
            let mut cell = substitution
                .min(table[at(i - 1, j)] + 1)
                .min(table[at(i, j - 1)] + 1);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                cell = cell.min(table[at(i - 2, j - 2)] + 1);
            }
            table[at(i, j)] = cell;
        }
    }

    table[at(a.len(), b.len())]
}
