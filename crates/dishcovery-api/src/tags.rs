//! SEO tags: derived keywords plus user-supplied labels.

use std::collections::HashSet;

/// Appended to every derived tag set.
pub const BASELINE_TAGS: [&str; 3] = ["recipe", "cooking", "food"];

/// Tokenize title, description and ingredient names into lower-case words.
/// Digits and punctuation split words and are dropped; single letters are
/// ignored. Order follows first appearance, baseline tags last.
pub fn derive_tags<'a, I>(title: &str, description: Option<&str>, ingredient_names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut text = String::from(title);
    if let Some(description) = description {
        text.push(' ');
        text.push_str(description);
    }
    for name in ingredient_names {
        text.push(' ');
        text.push_str(name);
    }

    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    let words = text
        .to_lowercase()
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| w.chars().count() > 1)
        .map(str::to_string)
        .collect::<Vec<_>>();

    for word in words.into_iter().chain(BASELINE_TAGS.iter().map(|t| t.to_string())) {
        if seen.insert(word.clone()) {
            tags.push(word);
        }
    }
    tags
}

/// User tags first, then derived tags. De-duplicated on the trimmed,
/// lower-cased form; the first occurrence keeps its casing.
pub fn merge_tags(user_tags: &[String], derived: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for tag in user_tags.iter().chain(derived) {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.to_lowercase()) {
            merged.push(tag.to_string());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn derives_words_without_digits_or_duplicates() {
        let tags = derive_tags(
            "Tofu Stir-Fry",
            Some("Quick tofu dinner for 2"),
            ["tofu", "soy sauce", "200g rice"],
        );
        assert_eq!(
            tags,
            strings(&[
                "tofu", "stir", "fry", "quick", "dinner", "for", "soy", "sauce", "rice", "recipe",
                "cooking", "food",
            ])
        );
    }

    #[test]
    fn baseline_tags_are_not_repeated() {
        let tags = derive_tags("Food", None, ["recipe"]);
        assert_eq!(tags, strings(&["food", "recipe", "cooking"]));
    }

    #[test]
    fn case_variants_collapse_to_first_seen() {
        let merged = merge_tags(&strings(&["Vegan", "vegan", "VEGAN"]), &[]);
        assert_eq!(merged, strings(&["Vegan"]));
    }

    #[test]
    fn user_tags_lead_and_win_over_derived() {
        let merged = merge_tags(
            &strings(&[" Weeknight ", "TOFU", ""]),
            &strings(&["tofu", "stir", "weeknight", "recipe"]),
        );
        assert_eq!(merged, strings(&["Weeknight", "TOFU", "stir", "recipe"]));
    }

    #[test]
    fn merging_is_stable_under_remerge() {
        let once = merge_tags(&strings(&["Spicy", "spicy "]), &strings(&["curry", "SPICY"]));
        let twice = merge_tags(&once, &once);
        assert_eq!(once, twice);
    }
}
