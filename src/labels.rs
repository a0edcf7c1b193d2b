//! Display-name to label transforms
//!
//! Every node is identified by a label: a code-safe identifier derived
//! deterministically from the human-readable display name. Classes use
//! upper camel case ("Bio Things" -> "BioThings"), properties lower camel
//! case ("bio things" -> "bioThings"). Both transforms are idempotent so a
//! label can be passed back through without changing.

/// Characters stripped by downstream annotation stores. Display names
/// containing them are flagged by `run_checks`.
pub const BLACKLISTED_CHARACTERS: &[char] = &['(', ')', '.', '-'];

/// Class label: blacklisted characters removed, each whitespace-separated
/// token capitalized, tokens joined.
pub fn class_label_from_display_name(display_name: &str) -> String {
    strip_blacklisted(display_name)
        .split_whitespace()
        .map(capitalize_first)
        .collect()
}

/// Property label: class transform with the leading character lowercased.
pub fn property_label_from_display_name(display_name: &str) -> String {
    let label = class_label_from_display_name(display_name);
    lowercase_first(&label)
}

/// The blacklisted characters present in a display name, in order of
/// appearance, deduplicated.
pub fn blacklisted_characters_in(display_name: &str) -> Vec<char> {
    let mut found = Vec::new();
    for c in display_name.chars() {
        if BLACKLISTED_CHARACTERS.contains(&c) && !found.contains(&c) {
            found.push(c);
        }
    }
    found
}

fn strip_blacklisted(s: &str) -> String {
    s.chars().filter(|c| !BLACKLISTED_CHARACTERS.contains(c)).collect()
}

fn capitalize_first(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lowercase_first(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_label() {
        assert_eq!(class_label_from_display_name("Bio Things"), "BioThings");
        assert_eq!(class_label_from_display_name("patient"), "Patient");
        assert_eq!(class_label_from_display_name("Year of Birth"), "YearOfBirth");
    }

    #[test]
    fn test_property_label() {
        assert_eq!(property_label_from_display_name("bio things"), "bioThings");
        assert_eq!(property_label_from_display_name("Patient ID"), "patientID");
    }

    #[test]
    fn test_idempotence() {
        let class = class_label_from_display_name("Bio Things");
        assert_eq!(class_label_from_display_name(&class), class);

        let prop = property_label_from_display_name("bio things");
        assert_eq!(property_label_from_display_name(&prop), prop);
    }

    #[test]
    fn test_blacklisted_characters_stripped() {
        assert_eq!(
            class_label_from_display_name("Patient (Deceased)"),
            "PatientDeceased"
        );
        assert_eq!(class_label_from_display_name("scRNA-seq"), "ScRNAseq");
    }

    #[test]
    fn test_blacklisted_characters_in() {
        assert_eq!(blacklisted_characters_in("a.b (c)"), vec!['.', '(', ')']);
        assert!(blacklisted_characters_in("clean name").is_empty());
    }
}
