use crate::core::config::{Config, Preset};

/// Built-in system-prompt presets, always available unless the config turns
/// them off.
pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset {
            id: "helpful".to_string(),
            name: "Helpful Assistant".to_string(),
            prompt: "You are helpful and friendly.".to_string(),
        },
        Preset {
            id: "code".to_string(),
            name: "Code Expert".to_string(),
            prompt: "You are an expert programmer.".to_string(),
        },
        Preset {
            id: "creative".to_string(),
            name: "Creative Writer".to_string(),
            prompt: "You are a creative storyteller.".to_string(),
        },
    ]
}

/// Merged view over built-in and config-defined presets. Config entries with
/// a built-in's id replace it.
pub struct PresetManager {
    presets: Vec<Preset>,
}

impl PresetManager {
    pub fn load(config: &Config) -> Self {
        let mut presets = if config.builtin_presets.unwrap_or(true) {
            builtin_presets()
        } else {
            Vec::new()
        };

        for preset in &config.presets {
            match presets
                .iter_mut()
                .find(|p| p.id.eq_ignore_ascii_case(&preset.id))
            {
                Some(existing) => *existing = preset.clone(),
                None => presets.push(preset.clone()),
            }
        }

        Self { presets }
    }

    pub fn list(&self) -> &[Preset] {
        &self.presets
    }

    pub fn find(&self, id: &str) -> Result<&Preset, String> {
        self.presets
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| {
                let available: Vec<&str> = self.presets.iter().map(|p| p.id.as_str()).collect();
                format!(
                    "Preset '{}' not found. Available presets: {}",
                    id,
                    available.join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_load_by_default() {
        let manager = PresetManager::load(&Config::default());
        let ids: Vec<&str> = manager.list().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["helpful", "code", "creative"]);
    }

    #[test]
    fn config_presets_extend_and_override() {
        let mut config = Config::default();
        config.presets.push(Preset {
            id: "code".to_string(),
            name: "Stricter Code Expert".to_string(),
            prompt: "You are a meticulous reviewer.".to_string(),
        });
        config.presets.push(Preset {
            id: "pirate".to_string(),
            name: "Pirate".to_string(),
            prompt: "You are a pirate.".to_string(),
        });

        let manager = PresetManager::load(&config);
        assert_eq!(manager.list().len(), 4);
        assert_eq!(manager.find("code").unwrap().name, "Stricter Code Expert");
        assert!(manager.find("pirate").is_ok());
    }

    #[test]
    fn builtins_can_be_disabled() {
        let config = Config {
            builtin_presets: Some(false),
            ..Default::default()
        };
        let manager = PresetManager::load(&config);
        assert!(manager.list().is_empty());
        let err = manager.find("helpful").unwrap_err();
        assert!(err.contains("not found"));
    }
}
