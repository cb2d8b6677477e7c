use crate::api::PersonaInfo;

/// Personas live on the backend; the client fetches the list, remembers the
/// active id, and forwards it with chat requests. The backend applies the
/// actual system prompt.
pub struct PersonaManager {
    personas: Vec<PersonaInfo>,
    active_id: Option<String>,
}

impl PersonaManager {
    pub fn new(remembered_id: Option<String>) -> Self {
        Self {
            personas: Vec::new(),
            active_id: remembered_id,
        }
    }

    /// Install the fetched list. A remembered active id that no longer
    /// exists is dropped so requests stop referencing it.
    pub fn set_personas(&mut self, personas: Vec<PersonaInfo>) {
        self.personas = personas;
        if let Some(id) = &self.active_id {
            if self.find(id).is_none() {
                self.active_id = None;
            }
        }
    }

    pub fn list(&self) -> &[PersonaInfo] {
        &self.personas
    }

    pub fn find(&self, id: &str) -> Option<&PersonaInfo> {
        self.personas.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn set_active(&mut self, id: &str) -> Result<&PersonaInfo, String> {
        if self.personas.is_empty() {
            return Err("No personas loaded from the backend yet.".to_string());
        }
        match self
            .personas
            .iter()
            .position(|p| p.id.eq_ignore_ascii_case(id))
        {
            Some(pos) => {
                self.active_id = Some(self.personas[pos].id.clone());
                Ok(&self.personas[pos])
            }
            None => {
                let available: Vec<&str> = self.personas.iter().map(|p| p.id.as_str()).collect();
                Err(format!(
                    "Persona '{}' not found. Available personas: {}",
                    id,
                    available.join(", ")
                ))
            }
        }
    }

    pub fn clear_active(&mut self) {
        self.active_id = None;
    }

    /// Id forwarded in chat requests.
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active_display(&self) -> String {
        match &self.active_id {
            Some(id) => self
                .find(id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.clone()),
            None => "none".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_personas() -> Vec<PersonaInfo> {
        vec![
            PersonaInfo {
                id: "coder".to_string(),
                name: "Code Assistant".to_string(),
                style: Some("technical".to_string()),
            },
            PersonaInfo {
                id: "pirate".to_string(),
                name: "Pirate".to_string(),
                style: None,
            },
        ]
    }

    #[test]
    fn set_active_validates_against_the_list() {
        let mut manager = PersonaManager::new(None);
        manager.set_personas(sample_personas());

        assert!(manager.set_active("coder").is_ok());
        assert_eq!(manager.active_id(), Some("coder"));

        let err = manager.set_active("poet").unwrap_err();
        assert!(err.contains("Available personas: coder, pirate"));
        assert_eq!(manager.active_id(), Some("coder"));
    }

    #[test]
    fn set_active_is_case_insensitive_but_stores_canonical_id() {
        let mut manager = PersonaManager::new(None);
        manager.set_personas(sample_personas());
        manager.set_active("CODER").unwrap();
        assert_eq!(manager.active_id(), Some("coder"));
    }

    #[test]
    fn remembered_id_survives_until_list_disagrees() {
        let mut manager = PersonaManager::new(Some("coder".to_string()));
        assert_eq!(manager.active_id(), Some("coder"));

        manager.set_personas(vec![PersonaInfo {
            id: "pirate".to_string(),
            name: "Pirate".to_string(),
            style: None,
        }]);
        assert_eq!(manager.active_id(), None);
    }

    #[test]
    fn active_display_prefers_the_name() {
        let mut manager = PersonaManager::new(None);
        manager.set_personas(sample_personas());
        assert_eq!(manager.active_display(), "none");
        manager.set_active("pirate").unwrap();
        assert_eq!(manager.active_display(), "Pirate");
    }

    #[test]
    fn empty_list_rejects_activation() {
        let mut manager = PersonaManager::new(None);
        assert!(manager.set_active("coder").is_err());
    }
}
