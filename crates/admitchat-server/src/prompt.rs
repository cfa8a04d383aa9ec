//! Domain instructions prepended to every relayed conversation.

use std::fs;
use std::path::Path;

/// Built-in college-application assistant instructions.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../prompts/college_admissions.md");

/// Load the system prompt, preferring an override file when configured.
pub fn load_system_prompt(path: Option<&Path>) -> anyhow::Result<String> {
    let Some(path) = path else {
        return Ok(DEFAULT_SYSTEM_PROMPT.trim().to_string());
    };

    let contents = fs::read_to_string(path).map_err(|err| {
        anyhow::anyhow!("Failed to read system prompt {}: {}", path.display(), err)
    })?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        anyhow::bail!("System prompt {} is empty", path.display());
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_is_admissions_assistant() {
        let prompt = load_system_prompt(None).unwrap();
        assert!(prompt.starts_with("You are a helpful assistant specialized in guiding users"));
        assert!(prompt.contains("**Financial Aid**"));
    }

    #[test]
    fn test_override_file_is_trimmed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prompt.md");
        fs::write(&path, "\n  Answer in one sentence.  \n").unwrap();

        assert_eq!(
            load_system_prompt(Some(&path)).unwrap(),
            "Answer in one sentence."
        );
    }

    #[test]
    fn test_empty_override_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prompt.md");
        fs::write(&path, "   \n").unwrap();

        assert!(load_system_prompt(Some(&path)).is_err());
    }
}
