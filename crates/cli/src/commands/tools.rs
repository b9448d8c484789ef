//! `chatmate tools` — list the knowledge tools the agent can call.

use chatmate_core::tool::ToolRegistry;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let registry = chatmate_tools::default_registry(&config.tools)?;
    print!("{}", render(&registry));
    Ok(())
}

fn render(registry: &ToolRegistry) -> String {
    if registry.is_empty() {
        return "No tools enabled. Enable them under [tools.*] in the config file.\n".into();
    }

    let mut out = String::from("Knowledge tools\n===============\n\n");
    for spec in registry.specs() {
        out.push_str(&format!(
            "  {:<10} top {}  max {} chars  timeout {}s\n",
            spec.name(),
            spec.result_limit(),
            spec.result_char_limit(),
            spec.timeout().as_secs()
        ));
        out.push_str(&format!("  {:<10} {}\n\n", "", spec.description()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmate_config::ToolsConfig;

    #[test]
    fn lists_limits_per_tool() {
        let registry = chatmate_tools::default_registry(&ToolsConfig::default()).unwrap();
        let text = render(&registry);
        assert!(text.contains("Search     top 1  max 1000 chars"));
        assert!(text.contains("arxiv      top 1  max 200 chars"));
        assert!(text.contains("wikipedia  top 1  max 200 chars"));
    }

    #[test]
    fn empty_registry_says_so() {
        let mut config = ToolsConfig::default();
        config.search.enabled = false;
        config.arxiv.enabled = false;
        config.wikipedia.enabled = false;
        let registry = chatmate_tools::default_registry(&config).unwrap();
        assert!(render(&registry).starts_with("No tools enabled"));
    }
}
