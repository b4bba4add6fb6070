use std::collections::HashSet;

/// Filler words removed before comparing two questions.
pub const FILLER_WORDS: [&str; 2] = ["如何", "怎麼"];

/// Token-set Jaccard similarity between two questions.
///
/// Both sides are lowercased, stripped of [`FILLER_WORDS`] and split on whitespace. Returns `0.0`
/// when either side has no tokens left.
pub fn jaccard(left: &str, right: &str) -> f32 {
	let left = token_set(left);
	let right = token_set(right);

	if left.is_empty() || right.is_empty() {
		return 0.0;
	}

	let intersection = left.intersection(&right).count();
	let union = left.union(&right).count();

	intersection as f32 / union as f32
}

/// Whether `query` is close enough to a stored question to reuse its pre-authored answer.
pub fn is_similar(query: &str, stored: &str, threshold: f32) -> bool {
	jaccard(query, stored) > threshold
}

fn token_set(text: &str) -> HashSet<String> {
	let mut cleaned = text.to_lowercase();

	for filler in FILLER_WORDS {
		cleaned = cleaned.replace(filler, "");
	}

	cleaned.split_whitespace().map(str::to_string).collect()
}
