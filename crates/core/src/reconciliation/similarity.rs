//! Description similarity for fuzzy matching.

use rust_decimal::Decimal;

/// Lowercases and keeps alphanumeric tokens separated by single spaces.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized Levenshtein similarity in `[0, 1]`.
///
/// Blank text on either side scores zero: an empty description is no
/// evidence of a match.
#[must_use]
pub fn similarity(left: &str, right: &str) -> Decimal {
    let left = normalize(left);
    let right = normalize(right);
    if left.is_empty() || right.is_empty() {
        return Decimal::ZERO;
    }

    let longest = left.chars().count().max(right.chars().count());
    let distance = levenshtein(&left, &right);
    Decimal::ONE - Decimal::from(distance) / Decimal::from(longest)
}

fn levenshtein(left: &str, right: &str) -> usize {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();

    if left.is_empty() {
        return right.len();
    }
    if right.is_empty() {
        return left.len();
    }

    let mut costs: Vec<usize> = (0..=right.len()).collect();

    for (i, left_char) in left.iter().enumerate() {
        let mut last_cost = i;
        costs[0] = i + 1;
        for (j, right_char) in right.iter().enumerate() {
            let next_cost = costs[j + 1];
            let cost = if left_char == right_char {
                last_cost
            } else {
                last_cost + 1
            };
            costs[j + 1] = cost.min(costs[j] + 1).min(next_cost + 1);
            last_cost = next_cost;
        }
    }

    costs[right.len()]
}
