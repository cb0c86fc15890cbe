//! Prompt loader for YAML prompt definitions.
//!
//! Definitions come from two places: a built-in catalogue compiled into the
//! binary, and optional workspace overrides in `.postapply/prompts/<id>.yml`.
//! An override replaces the built-in definition with the same id.

use crate::builder::build_prompt;
use crate::types::{BuiltPrompt, PromptDefinition};
use postapply_core::{AppError, AppResult};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    ("rag.grounded", include_str!("../prompts/rag.grounded.yml")),
    ("rag.reconciled", include_str!("../prompts/rag.reconciled.yml")),
    ("chain.timing", include_str!("../prompts/chain.timing.yml")),
    ("chain.message", include_str!("../prompts/chain.message.yml")),
    ("chain.strategy", include_str!("../prompts/chain.strategy.yml")),
    (
        "chain.confidence.timing",
        include_str!("../prompts/chain.confidence.timing.yml"),
    ),
    (
        "chain.confidence.style",
        include_str!("../prompts/chain.confidence.style.yml"),
    ),
];

/// Set of prompt definitions keyed by id.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    prompts: BTreeMap<String, PromptDefinition>,
}

impl PromptCatalog {
    /// Catalogue containing only the compiled-in definitions.
    pub fn builtin() -> AppResult<Self> {
        let mut prompts = BTreeMap::new();
        for (id, source) in BUILTIN_PROMPTS {
            let definition = parse_prompt(source, id)?;
            prompts.insert(definition.id.clone(), definition);
        }
        Ok(Self { prompts })
    }

    /// Built-in catalogue with workspace overrides applied.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut catalog = Self::builtin()?;
        for id in list_prompts(workspace_path)? {
            let definition = load_prompt(workspace_path, &id)?;
            tracing::info!("Using workspace prompt override: {}", definition.id);
            catalog.prompts.insert(definition.id.clone(), definition);
        }
        Ok(catalog)
    }

    /// Look up a definition by id.
    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.prompts
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))
    }

    /// Render the definition `id` with `variables`.
    pub fn render(&self, id: &str, variables: HashMap<String, String>) -> AppResult<BuiltPrompt> {
        build_prompt(self.get(id)?, variables)
    }

    /// All known prompt ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.prompts.keys().map(String::as_str).collect()
    }
}

/// Load a prompt definition by ID from the workspace.
///
/// This function searches for a prompt file named `<id>.yml` in the
/// `.postapply/prompts/` directory.
///
/// # Example
/// ```no_run
/// use postapply_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "chain.timing")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".postapply/prompts")
        .join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    parse_prompt(&contents, &prompt_file.display().to_string())
}

/// List all prompt IDs overridden in the workspace.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let prompts_dir = workspace_path.join(".postapply/prompts");

    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&prompts_dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    Ok(prompt_ids)
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;
    tracing::debug!("Loaded prompt: {} ({})", definition.id, definition.title);
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Validate API version format (simple check)
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_prompt(dir: &Path, id: &str, valid: bool) -> PathBuf {
        let prompts_dir = dir.join(".postapply/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();

        let content = if valid {
            format!(
                r#"
id: {}
title: "Test Prompt"
apiVersion: "1.0"
createdBy: test
template: "Override: {{{{question}}}}"
output:
  format: markdown
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = prompts_dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = PromptCatalog::builtin().unwrap();
        assert_eq!(catalog.ids().len(), BUILTIN_PROMPTS.len());
        for (id, _) in BUILTIN_PROMPTS {
            assert!(catalog.get(id).is_ok(), "missing {}", id);
        }
        assert_eq!(
            catalog.get("chain.strategy").unwrap().generation.max_tokens,
            Some(2000)
        );
    }

    #[test]
    fn test_builtin_grounded_renders_system_and_user() {
        let catalog = PromptCatalog::builtin().unwrap();
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "[01_timing.txt]\nWait".to_string());
        vars.insert("question".to_string(), "When?".to_string());

        let built = catalog.render("rag.grounded", vars).unwrap();
        assert_eq!(built.user, "When?");
        assert!(built.system.unwrap().ends_with("[01_timing.txt]\nWait"));
    }

    #[test]
    fn test_workspace_override_replaces_builtin() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "rag.grounded", true);

        let catalog = PromptCatalog::load(temp_dir.path()).unwrap();
        let def = catalog.get("rag.grounded").unwrap();
        assert_eq!(def.title, "Test Prompt");
        assert!(def.system.is_none());
    }

    #[test]
    fn test_unknown_prompt() {
        let catalog = PromptCatalog::builtin().unwrap();
        assert!(catalog.get("nope").is_err());
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "invalid", false);
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "prompt2", true);
        create_test_prompt(temp_dir.path(), "prompt1", true);

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["prompt1".to_string(), "prompt2".to_string()]);
    }
}
