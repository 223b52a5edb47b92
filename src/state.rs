//! Application state: settings, prompts and the upstream provider clients.
//!
//! All providers share one `reqwest::Client`. A provider whose environment
//! variables are missing stays disabled and remembers which ones were
//! missing, so requests to it can say exactly what to set.

use tracing::{info, instrument, warn};

use crate::config::{load_quiz_config_from_env, Prompts, Settings};
use crate::error::UpstreamError;
use crate::gemini::Gemini;
use crate::gradio::GradioSpace;
use crate::openrouter::OpenRouter;
use crate::trivia::TriviaDb;

type Provider<T> = Result<T, Vec<&'static str>>;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub prompts: Prompts,
    gemini: Provider<Gemini>,
    openrouter: Provider<OpenRouter>,
    gradio: Provider<GradioSpace>,
    pub trivia: TriviaDb,
}

impl AppState {
    /// Build state from env: load prompts (TOML or defaults), then init providers.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let prompts = load_quiz_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();
        Self::new(Settings::from_env(), prompts)
    }

    pub fn new(settings: Settings, prompts: Prompts) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.upstream_timeout())
            .build()?;

        let gemini = announce("generative API", Gemini::from_settings(client.clone(), &settings));
        let openrouter = announce("OpenRouter", OpenRouter::from_settings(client.clone(), &settings));
        let gradio = announce("community space", GradioSpace::from_settings(client.clone(), &settings));
        if let Ok(g) = &gradio {
            info!(target: "quizrelay_backend", candidates = g.candidates.len(), has_token = g.token.is_some(), "Community space candidates prepared");
        }
        let trivia = TriviaDb::new(client, settings.trivia_url());
        info!(target: "quizrelay_backend", url = %trivia.api_url, "Trivia database enabled.");

        Ok(Self { settings, prompts, gemini, openrouter, gradio, trivia })
    }

    pub fn gemini(&self) -> Result<&Gemini, UpstreamError> {
        self.gemini.as_ref().map_err(not_configured)
    }

    pub fn openrouter(&self) -> Result<&OpenRouter, UpstreamError> {
        self.openrouter.as_ref().map_err(not_configured)
    }

    pub fn gradio(&self) -> Result<&GradioSpace, UpstreamError> {
        self.gradio.as_ref().map_err(not_configured)
    }
}

fn announce<T>(name: &str, built: Provider<T>) -> Provider<T> {
    match &built {
        Ok(_) => info!(target: "quizrelay_backend", provider = name, "Provider enabled."),
        Err(missing) => warn!(target: "quizrelay_backend", provider = name, missing = %missing.join(", "), "Provider disabled (environment variables not set)."),
    }
    built
}

fn not_configured(missing: &Vec<&'static str>) -> UpstreamError {
    UpstreamError::NotConfigured(missing.clone())
}
