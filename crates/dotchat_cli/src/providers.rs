use std::sync::Arc;

use chat_provider::{ChatProvider, ProviderInitError};
use chat_provider_anthropic::{AnthropicProvider, AnthropicProviderConfig};
use chat_provider_google::{GoogleProvider, GoogleProviderConfig};
use chat_provider_mock::MockProvider;
use chat_provider_openai::{OpenAiProvider, OpenAiProviderConfig};

use crate::cli::ServiceName;
use crate::config::Settings;

/// Builds the provider for the resolved service.
///
/// `api_key` is required for services that authenticate and ignored otherwise.
pub fn provider_for_service(
    settings: &Settings,
    api_key: Option<&str>,
) -> Result<Arc<dyn ChatProvider>, ProviderInitError> {
    match settings.service {
        ServiceName::Mock => Ok(Arc::new(MockProvider::default())),
        ServiceName::OpenAi => {
            let api_key = required_key(settings.service, api_key)?;
            let mut config = OpenAiProviderConfig::new(api_key, settings.openai_model.clone());
            if let Some(base_url) = &settings.openai_base_url {
                config = config.with_base_url(base_url.clone());
            }
            if let Some(organization) = &settings.openai_organization {
                config = config.with_organization(organization.clone());
            }
            if let Some(timeout) = settings.timeout {
                config = config.with_timeout(timeout);
            }
            Ok(Arc::new(OpenAiProvider::new(config)?))
        }
        ServiceName::Anthropic => {
            let api_key = required_key(settings.service, api_key)?;
            let mut config =
                AnthropicProviderConfig::new(api_key, settings.anthropic_model.clone())
                    .with_max_tokens(settings.anthropic_max_tokens);
            if let Some(base_url) = &settings.anthropic_base_url {
                config = config.with_base_url(base_url.clone());
            }
            if let Some(timeout) = settings.timeout {
                config = config.with_timeout(timeout);
            }
            Ok(Arc::new(AnthropicProvider::new(config)?))
        }
        ServiceName::Google => {
            let api_key = required_key(settings.service, api_key)?;
            let mut config = GoogleProviderConfig::new(api_key, settings.google_model.clone());
            if let Some(base_url) = &settings.google_base_url {
                config = config.with_base_url(base_url.clone());
            }
            if let Some(timeout) = settings.timeout {
                config = config.with_timeout(timeout);
            }
            Ok(Arc::new(GoogleProvider::new(config)?))
        }
    }
}

fn required_key(service: ServiceName, api_key: Option<&str>) -> Result<&str, ProviderInitError> {
    api_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            ProviderInitError::new(format!("{} API key is required", service.display_name()))
        })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use time::{Date, Month};

    use super::*;
    use crate::cli::Cli;
    use crate::config::{EnvConfig, FileConfig};

    fn settings(service: ServiceName) -> Settings {
        let mut settings = Settings::resolve(
            &Cli::default(),
            FileConfig::default(),
            &EnvConfig::default(),
            Path::new("/app"),
            Date::from_calendar_date(2026, Month::October, 19).expect("valid date"),
        )
        .expect("defaults resolve");
        settings.service = service;
        settings
    }

    #[test]
    fn mock_needs_no_key() {
        let provider = provider_for_service(&settings(ServiceName::Mock), None)
            .expect("mock provider should resolve");
        assert_eq!(provider.profile().provider_id, "mock");
    }

    #[test]
    fn openai_uses_configured_model() {
        let mut settings = settings(ServiceName::OpenAi);
        settings.openai_model = "gpt-4o-mini".to_string();

        let provider = provider_for_service(&settings, Some("sk-test"))
            .expect("openai provider should resolve");
        let profile = provider.profile();
        assert_eq!(profile.provider_id, "openai");
        assert_eq!(profile.model_id, "gpt-4o-mini");
    }

    #[test]
    fn anthropic_uses_configured_model() {
        let mut settings = settings(ServiceName::Anthropic);
        settings.anthropic_model = "claude-sonnet-4-0".to_string();

        let provider = provider_for_service(&settings, Some("sk-ant"))
            .expect("anthropic provider should resolve");
        let profile = provider.profile();
        assert_eq!(profile.provider_id, "anthropic");
        assert_eq!(profile.model_id, "claude-sonnet-4-0");
    }

    #[test]
    fn anthropic_without_key_fails() {
        let error = match provider_for_service(&settings(ServiceName::Anthropic), None) {
            Ok(_) => panic!("missing key should fail"),
            Err(error) => error,
        };
        assert_eq!(error.message(), "Anthropic API key is required");
    }

    #[test]
    fn google_uses_configured_model() {
        let provider = provider_for_service(&settings(ServiceName::Google), Some("g-key"))
            .expect("google provider should resolve");
        let profile = provider.profile();
        assert_eq!(profile.provider_id, "google");
        assert_eq!(profile.model_id, "gemini-2.5-flash-preview-05-20");
    }

    #[test]
    fn openai_without_key_fails() {
        let error = match provider_for_service(&settings(ServiceName::OpenAi), Some("  ")) {
            Ok(_) => panic!("blank key should fail"),
            Err(error) => error,
        };
        assert!(error.message().contains("API key"));
    }
}
