use crate::api::ProviderInfo;
use crate::core::config::Config;

/// Tracks the provider list fetched from the backend and which one chat
/// requests should name. `None` means the backend's default.
pub struct ProviderManager {
    providers: Vec<ProviderInfo>,
    current: Option<String>,
}

impl ProviderManager {
    pub fn new(remembered_id: Option<String>) -> Self {
        Self {
            providers: Vec::new(),
            current: remembered_id,
        }
    }

    pub fn set_providers(&mut self, providers: Vec<ProviderInfo>, backend_current: Option<String>) {
        self.providers = providers;
        if self.current.is_none() {
            self.current = backend_current;
        }
        if let Some(id) = &self.current {
            if self.find(id).is_none() {
                self.current = None;
            }
        }
    }

    pub fn list(&self) -> &[ProviderInfo] {
        &self.providers
    }

    pub fn find(&self, id: &str) -> Option<&ProviderInfo> {
        self.providers
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn set_current(&mut self, id: &str) -> Result<&ProviderInfo, String> {
        if self.providers.is_empty() {
            return Err("No providers loaded from the backend yet.".to_string());
        }
        match self
            .providers
            .iter()
            .position(|p| p.id.eq_ignore_ascii_case(id))
        {
            Some(pos) => {
                self.current = Some(self.providers[pos].id.clone());
                Ok(&self.providers[pos])
            }
            None => {
                let available: Vec<&str> = self.providers.iter().map(|p| p.id.as_str()).collect();
                Err(format!(
                    "Provider '{}' not found. Available providers: {}",
                    id,
                    available.join(", ")
                ))
            }
        }
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_display(&self) -> String {
        match &self.current {
            Some(id) => self
                .find(id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.clone()),
            None => "backend default".to_string(),
        }
    }

    /// Provider id and API key to attach to an outbound chat request. The key
    /// comes from the config; providers that need none simply have no entry.
    pub fn request_fields(&self, config: &Config) -> (Option<String>, Option<String>) {
        match &self.current {
            Some(id) => {
                let key = config.api_key_for(id).cloned();
                (Some(id.clone()), key)
            }
            None => (None, None),
        }
    }

    /// True when the selected provider declares it needs a key and the config
    /// has none for it. Used to warn before a doomed request.
    pub fn missing_key(&self, config: &Config) -> Option<&ProviderInfo> {
        let id = self.current.as_deref()?;
        let provider = self.find(id)?;
        if provider.needs_key && config.api_key_for(id).is_none() {
            Some(provider)
        } else {
            None
        }
    }
}
