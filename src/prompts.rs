// prompts.rs

/// Prompt asking the model to tag named entities in a single record, Portuguese locale.
pub fn entity_recognition_prompt(record_text: &str) -> String {
    format!(
        r#"
TEXTO DO PEDIDO (PARA RECONHECIMENTO DE ENTIDADES):
----------
{record}
----------

TASK: Perform named-entity recognition on the Brazilian Portuguese text above.

GUIDELINES:
1. Tag every named entity with exactly one of:
   - PER: an individual person's name
   - ORG: companies, agencies, government bodies, departments
   - LOC: countries, cities, streets, regions, addresses
   - MISC: any other named entity
2. Copy each span exactly as written in the text, keeping accents and capitalization.
3. Do not invent entities that are not in the text.
4. Return every occurrence, in the order it appears, including repeats.

RETURN FORMAT (JSON):
{{
  "entities": [
    {{ "text": "span exactly as written", "type": "PER|ORG|LOC|MISC" }}
  ]
}}

If there are no entities, return {{"entities": []}}. Return only the JSON object.
"#,
        record = record_text
    )
}
