//! Instructional prompt sent alongside each pictogram.

/// Build the enrichment prompt for a pictogram whose file stem is `hint`.
pub fn build_prompt(hint: &str) -> String {
    format!(
        r#"You are an expert data enricher for a Dutch pictogram system. Analyze the provided image and generate metadata for it. The image's filename, "{hint}", names the primary concept.

Return a single, minified JSON object (no newlines, no markdown) with exactly this structure:
- "translations": an object with keys "en", "fr" and "de" holding the concept translated into English, French and German.
- "tags": an array of 5-7 relevant lowercase keywords **in Dutch**.
- "description": one concise, objective sentence **in Dutch** describing the image.

Example output for an image of a car being washed with filename "auto wassen":
{{"translations":{{"en":"wash the car","fr":"laver la voiture","de":"Auto waschen"}},"tags":["auto","wassen","schoonmaken","water","voertuig","taak"],"description":"Een persoon wast de buitenkant van een auto met zeep en water."}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::parse_response;

    #[test]
    fn test_prompt_mentions_hint() {
        let prompt = build_prompt("tanden poetsen");
        assert!(prompt.contains("\"tanden poetsen\""));
    }

    #[test]
    fn test_prompt_example_satisfies_contract() {
        let prompt = build_prompt("x");
        let example = prompt
            .lines()
            .last()
            .unwrap();
        assert!(parse_response(example).is_ok());
    }
}
