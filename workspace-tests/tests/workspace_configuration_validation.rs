use std::fs;
use std::path::Path;

/// Workspace layout checks: members, crate types and the shared
/// dependency table.
#[cfg(test)]
mod workspace_configuration_tests {
    use super::*;

    fn read(path: &str) -> String {
        fs::read_to_string(path).unwrap_or_else(|e| panic!("Should be able to read {}: {}", path, e))
    }

    #[test]
    fn test_root_cargo_toml_contains_expected_members() {
        let cargo_content = read("../Cargo.toml");

        assert!(
            cargo_content.contains("[workspace]"),
            "Root Cargo.toml should contain [workspace] section"
        );

        for member in ["script-core", "script-agent", "workspace-tests"] {
            assert!(
                cargo_content.contains(&format!("\"{}\"", member)),
                "Root Cargo.toml should contain member: {}",
                member
            );
        }

        assert!(
            cargo_content.contains("resolver = \"2\""),
            "Root Cargo.toml should use resolver version 2"
        );
    }

    #[test]
    fn test_crate_types_configured_correctly() {
        assert!(Path::new("../script-core/src/lib.rs").exists());
        assert!(!Path::new("../script-core/src/main.rs").exists());

        assert!(Path::new("../script-agent/src/main.rs").exists());
        let agent = read("../script-agent/Cargo.toml");
        assert!(agent.contains("[[bin]]"));
        assert!(agent.contains("name = \"netscript-agent\""));
    }

    #[test]
    fn test_shared_dependencies_come_from_workspace() {
        let root = read("../Cargo.toml");
        for dep in ["tokio", "serde", "serde_json", "tracing", "thiserror", "hudsucker"] {
            assert!(
                root.contains(&format!("\n{} = ", dep)),
                "workspace should declare {}",
                dep
            );
        }

        let core = read("../script-core/Cargo.toml");
        for dep in ["tokio", "tracing", "serde_json", "hudsucker", "reqwest"] {
            assert!(
                core.contains(&format!("{} = {{ workspace = true", dep)),
                "script-core should take {} from the workspace",
                dep
            );
        }
    }

    /// Names under `[dependencies]` in a manifest
    fn declared_dependencies(manifest: &str) -> Vec<String> {
        manifest
            .lines()
            .skip_while(|line| line.trim() != "[dependencies]")
            .skip(1)
            .take_while(|line| !line.trim_start().starts_with('['))
            .filter_map(|line| line.split_once('=').map(|(name, _)| name.trim().to_string()))
            .filter(|name| !name.is_empty() && !name.starts_with('#'))
            .collect()
    }

    #[test]
    fn test_agent_dependencies_are_used() {
        let manifest = read("../script-agent/Cargo.toml");
        let sources: String = fs::read_dir("../script-agent/src")
            .expect("Should be able to list agent sources")
            .map(|entry| read(entry.unwrap().path().to_str().unwrap()))
            .collect();

        let declared = declared_dependencies(&manifest);
        assert!(declared.contains(&"script-core".to_string()));
        for dep in declared {
            let crate_name = dep.replace('-', "_");
            assert!(
                sources.contains(&format!("{}::", crate_name))
                    || sources.contains(&format!("use {}", crate_name))
                    || sources.contains(&format!("{}!", crate_name)),
                "script-agent declares {} but never uses it",
                dep
            );
        }
    }
}
