use std::collections::{BTreeMap, BTreeSet};

/// Lowercases and splits on anything that is not an ASCII letter or digit.
pub fn tokenize(text: &str) -> Vec<String> {
	text.to_lowercase()
		.split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
		.filter(|t| !t.is_empty())
		.map(str::to_string)
		.collect()
}

pub fn unique_terms(text: &str) -> BTreeSet<String> {
	tokenize(text).into_iter().collect()
}

pub fn term_counts(text: &str) -> BTreeMap<String, u32> {
	let mut counts = BTreeMap::new();
	for tok in tokenize(text) { *counts.entry(tok).or_insert(0) += 1; }
	counts
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_non_alphanumeric_runs() {
		assert_eq!(tokenize("Built C++ APIs, v2.0 -- in 3 weeks!"), vec!["built", "c", "apis", "v2", "0", "in", "3", "weeks"]);
	}

	#[test]
	fn non_ascii_letters_are_separators() {
		assert_eq!(tokenize("café naïve"), vec!["caf", "na", "ve"]);
		assert!(tokenize("  ...  ").is_empty());
	}

	#[test]
	fn counts_repeated_terms() {
		let counts = term_counts("the cat and the hat");
		assert_eq!(counts.get("the"), Some(&2));
		assert_eq!(counts.get("cat"), Some(&1));
		assert_eq!(unique_terms("a a b").len(), 2);
	}
}
