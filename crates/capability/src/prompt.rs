use crate::types::CapabilityInput;

/// Prompt for the `alerts` extraction capability.
pub fn alerts_prompt(text: &str) -> String {
    format!(
        r#"You review employee feedback comments for workplace alerts.

INSTRUCTIONS:
1. Read the comment and find every excerpt that signals a workplace alert
2. Label each excerpt with exactly one alert type
3. If the comment contains no alerts, classify it instead
4. Output ONLY valid JSON, nothing else

ALERT TYPES:
discrimination, harassment, profanity, fraud, safety, retaliation, burnout

SCHEMA:
{{
  "has_labels": true,
  "spans": [
    {{"excerpt": "verbatim quote from the comment", "label": "alert_type", "reasoning": "one sentence", "severity": "low|medium|high"}}
  ],
  "classification": null,
  "classification_reasoning": ""
}}

If there are no alerts:
{{
  "has_labels": false,
  "spans": [],
  "classification": "praise|neutral|suggestion|venting",
  "classification_reasoning": "one sentence"
}}

RULES:
- Excerpts must be verbatim substrings of the comment
- One label per span; use a second span if two labels apply to the same words
- Do not invent alerts that are not in the text
- Output ONLY the JSON object, no markdown, no explanations

COMMENT:
{text}

JSON OUTPUT:"#
    )
}

/// Prompt for the `recommendations` extraction capability.
pub fn recommendations_prompt(text: &str) -> String {
    format!(
        r#"You extract actionable recommendations from employee feedback comments.

INSTRUCTIONS:
1. Find every excerpt where the employee asks for a concrete change
2. Label each excerpt with the kind of change requested
3. If the comment contains no recommendation, classify it instead
4. Output ONLY valid JSON, nothing else

RECOMMENDATION LABELS:
add_or_increase, remove_or_decrease, change_process, change_people, keep_as_is

SCHEMA:
{{
  "has_labels": true,
  "spans": [
    {{"excerpt": "verbatim quote from the comment", "label": "recommendation_label", "reasoning": "one sentence", "paraphrase": "the request in plain words"}}
  ],
  "classification": null,
  "classification_reasoning": ""
}}

If there is no recommendation:
{{
  "has_labels": false,
  "spans": [],
  "classification": "praise|complaint|neutral",
  "classification_reasoning": "one sentence"
}}

RULES:
- Excerpts must be verbatim substrings of the comment
- Output ONLY the JSON object, no markdown, no explanations

COMMENT:
{text}

JSON OUTPUT:"#
    )
}

/// Prompt for the `composition` capability: weave sampled excerpts into one
/// coherent synthetic comment.
pub fn composition_prompt(input: &CapabilityInput) -> String {
    // composition is registered with the excerpt-set shape
    let CapabilityInput::ExcerptSet(set) = input else {
        return String::new();
    };

    let excerpt_list = set
        .excerpts
        .iter()
        .zip(set.source_labels.iter())
        .enumerate()
        .map(|(i, (excerpt, label))| format!("{}. \"{excerpt}\" (exhibits: {label})", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You write realistic employee feedback comments.

Compose a single, coherent employee comment that naturally incorporates the
following excerpts. The final comment should read as if one person wrote it.

EXCERPTS TO INCORPORATE:
{excerpt_list}

REQUIREMENTS:
1. Preserve the core meaning of each excerpt; do not water it down
2. Create natural flow with transitions and varied sentence structure
3. Keep one consistent voice throughout
4. Aim for 2-5 sentences, depending on the number of excerpts

DO NOT:
- Add new complaints or issues not present in the excerpts
- Remove or soften the key element of any excerpt
- Make it sound artificial or overly formal

OUTPUT FORMAT (JSON only):
{{
  "composed_text": "the final composed comment",
  "coherence_notes": "one sentence on how the excerpts were connected"
}}

Return ONLY valid JSON."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExcerptSet;

    #[test]
    fn alerts_prompt_embeds_text() {
        let prompt = alerts_prompt("my manager yelled at me");
        assert!(prompt.contains("my manager yelled at me"));
        assert!(prompt.contains("has_labels"));
    }

    #[test]
    fn composition_prompt_numbers_excerpts_with_labels() {
        let set = ExcerptSet {
            excerpts: vec!["called me a slur".into(), "need more training".into()],
            source_labels: vec!["discrimination".into(), "add_or_increase".into()],
            source_text_ids: vec!["t1".into(), "t2".into()],
            target_labels: vec!["discrimination".into(), "add_or_increase".into()],
        };

        let prompt = composition_prompt(&CapabilityInput::ExcerptSet(set));
        assert!(prompt.contains("1. \"called me a slur\" (exhibits: discrimination)"));
        assert!(prompt.contains("2. \"need more training\" (exhibits: add_or_increase)"));
    }
}
