use super::Operation;
use serde_json::Value;

const COACH: &str = "You are a Non-Violent Communication (NVC) coach helping someone express themselves without blame.";

pub fn compose(op: Operation, text: &str, context: Option<&Value>) -> String {
    let context = render_context(context);
    match op {
        Operation::NeutralizeObservation => format!(
            "{COACH}\n\
             Decide whether this observation contains judgment, evaluation, blame or interpretation \
             instead of a neutral description of what happened.\n\n\
             Observation: \"{text}\"\n\
             {context}\n\
             Respond exactly in this format:\n\
             Judgment: Yes or No\n\
             Alternatives: up to 3 neutral, factual rephrasings separated by commas (only if Judgment is Yes)"
        ),
        Operation::RefineRequest => format!(
            "{COACH}\n\
             Decide whether this request is a demand, vague, or phrased negatively (what not to do) \
             rather than a clear, positive, doable request.\n\n\
             Request: \"{text}\"\n\
             {context}\n\
             Respond exactly in this format:\n\
             Judgment: Yes or No\n\
             Alternatives: up to 3 concrete requests starting with \"Would you be willing to\", separated by commas (only if Judgment is Yes)"
        ),
        Operation::SuggestFeelings => format!(
            "{COACH}\n\
             Suggest up to 5 genuine feelings (not interpretations such as \"ignored\" or \"betrayed\") \
             the person may be experiencing in this situation.\n\n\
             Situation: \"{text}\"\n\
             {context}\n\
             Respond with a comma-separated list of single feeling words only."
        ),
        Operation::SuggestNeeds => format!(
            "{COACH}\n\
             Suggest up to 5 universal human needs that may be behind these feelings. \
             Use needs, not strategies involving a specific person.\n\n\
             Situation: \"{text}\"\n\
             {context}\n\
             Respond with a comma-separated list of needs only."
        ),
        Operation::GenerateReflection => format!(
            "{COACH}\n\
             Write a short, warm reflection (2-3 sentences) that mirrors back the person's observation, \
             feeling, need and request, without advice or judgment.\n\n\
             Statement: \"{text}\"\n\
             {context}\n\
             Respond with the reflection text only."
        ),
    }
}

/// Renders structured context as `Key: value` lines. Arrays are comma joined.
fn render_context(context: Option<&Value>) -> String {
    match context {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => format!("Context: {}\n", s),
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(key, value)| {
                let rendered = render_value(value);
                (!rendered.is_empty()).then(|| format!("{}: {}\n", capitalize(key), rendered))
            })
            .collect(),
        Some(other) => format!("Context: {}\n", render_value(other)),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}
