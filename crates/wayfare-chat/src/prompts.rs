//! Prompt templates for the four query stages.
//!
//! Each template demands exactly one JSON object (except the composer,
//! which produces prose) so the completion can be parsed strictly at the
//! stage boundary. Rendering is plain placeholder substitution; the
//! literal braces in the schema blocks are left untouched.

/// Validator stage template.
pub const VALIDATION_TEMPLATE: &str = r#"Validate whether the following input is a proper travel duration query containing both an origin and a destination, and whether it mentions a travel mode ('driving'/'walking'/'bicycling'/'transit'):

{user_input}

Respond with exactly one JSON object, no prose and no code fences, with this structure:
{
    "is_valid": bool,
    "reason": string,
    "origin": string or null,
    "destination": string or null,
    "has_mode": bool
}

If the input is valid, set is_valid to true and provide the extracted origin, the extracted destination, and whether a travel mode is mentioned.
If the input is invalid, set is_valid to false and explain why in reason."#;

/// Destination-classifier stage template.
pub const CLASSIFICATION_TEMPLATE: &str = r#"Classify the following destination as either a 'general' or a 'specific' place:

Destination: {destination}

Respond with exactly one JSON object, no prose and no code fences, with this structure:
{
    "classification": "general" or "specific",
    "confidence": float between 0 and 1,
    "reason": string explaining the classification
}

A 'general' place is a chain store or a type of business.
A 'specific' place is a street address or a unique landmark.

Examples:
- "Walgreens" is "general"
- "McDonald's" is "general"
- "1 Market St, San Francisco, CA" is "specific"
- "Eiffel Tower" is "specific"
- "Empire State Building, 350 5th Ave, New York, NY 10118" is "specific""#;

/// Location/mode-extractor stage template.
pub const EXTRACTION_TEMPLATE: &str = r#"Extract the full origin, destination, and travel mode ('driving'/'walking'/'bicycling'/'transit') from this query: {user_input}

Respond with exactly one JSON object, no prose and no code fences, with keys "origin", "destination", and "mode". The mode must be one of the four quoted tokens, lowercase."#;

/// Final-response composer template.
pub const COMPOSITION_TEMPLATE: &str = r#"Based on the following travel information: {travel_info}

Recent conversation:
{history}

Provide a short natural language response about the travel duration and arrival time. If the travel information shows no duration or ETA, reply exactly: no route was found from origin to destination"#;

/// Render the validator prompt for a raw user query.
pub fn validation_prompt(user_input: &str) -> String {
    VALIDATION_TEMPLATE.replace("{user_input}", user_input)
}

/// Render the classifier prompt for a destination string.
pub fn classification_prompt(destination: &str) -> String {
    CLASSIFICATION_TEMPLATE.replace("{destination}", destination)
}

/// Render the extractor prompt for a validated query.
pub fn extraction_prompt(user_input: &str) -> String {
    EXTRACTION_TEMPLATE.replace("{user_input}", user_input)
}

/// Render the composer prompt for a travel-info summary and recent
/// conversation context.
pub fn composition_prompt(travel_info: &str, history: &str) -> String {
    let history = if history.is_empty() { "(none)" } else { history };
    COMPOSITION_TEMPLATE
        .replace("{travel_info}", travel_info)
        .replace("{history}", history)
}
