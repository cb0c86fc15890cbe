//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use handlebars::Handlebars;
use postapply_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// This function:
/// 1. Checks that every variable declared under `input.variables` is supplied
/// 2. Renders the system template (if any) and the user template with Handlebars
/// 3. Returns a `BuiltPrompt` carrying the definition's generation parameters
///
/// # Example
/// ```no_run
/// use postapply_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "When should I follow up?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .input
        .variables
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt {} is missing variables: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        max_tokens: definition.generation.max_tokens,
        temperature: definition.generation.temperature,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            resolved_variables: variables,
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationParams, PromptInputSpec, PromptOutputSpec};

    fn create_test_definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            input: PromptInputSpec {
                variables: vec!["question".to_string()],
            },
            system: system.map(str::to_string),
            template: "Question: {{question}}".to_string(),
            generation: GenerationParams {
                max_tokens: Some(200),
                temperature: None,
            },
            output: PromptOutputSpec {
                format: "markdown".to_string(),
            },
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{prompt}}", &vars(&[("prompt", "Hello")]));
        assert_eq!(result.unwrap(), "Question: Hello");
    }

    #[test]
    fn test_render_does_not_escape() {
        let result = render_template("{{x}}", &vars(&[("x", "<b>&\"")]));
        assert_eq!(result.unwrap(), "<b>&\"");
    }

    #[test]
    fn test_build_prompt_user_only() {
        let def = create_test_definition(None);
        let built = build_prompt(&def, vars(&[("question", "Test question")])).unwrap();

        assert_eq!(built.user, "Question: Test question");
        assert!(built.system.is_none());
        assert_eq!(built.max_tokens, Some(200));
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_build_prompt_with_system() {
        let def = create_test_definition(Some("Context:\n{{context}}"));
        let built = build_prompt(
            &def,
            vars(&[("question", "Q"), ("context", "[a.txt]\nbody")]),
        )
        .unwrap();

        assert_eq!(built.system.as_deref(), Some("Context:\n[a.txt]\nbody"));
    }

    #[test]
    fn test_missing_declared_variable() {
        let def = create_test_definition(None);
        let err = build_prompt(&def, HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("question"));
    }

    #[test]
    fn test_undeclared_missing_variable_fails_strict_render() {
        let result = render_template("Question: {{missing}}", &HashMap::new());
        assert!(result.is_err());
    }
}
