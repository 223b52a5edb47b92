//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Field names follow what the browser frontend already sends (camelCase).

use serde::{Deserialize, Serialize};

use crate::assistant::AssistantMode;
use crate::domain::{ChatMessage, Language, QuizItem};
use crate::util::{de_opt_count, de_opt_text};

/// Which upstream a WebSocket session should generate from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Gemini,
    #[serde(alias = "custom")]
    OpenRouter,
    Gradio,
    Trivia,
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Generate {
        provider: Provider,
        #[serde(default)]
        topic: String,
        #[serde(rename = "numberOfQuestions", default, deserialize_with = "de_opt_count")]
        number_of_questions: Option<u32>,
        #[serde(default, deserialize_with = "de_opt_text")]
        difficulty: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default, deserialize_with = "de_opt_text")]
        category: Option<String>,
    },
    Answer {
        option: String,
    },
    Next,
    Hint,
    AskAi {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        mode: Option<AssistantMode>,
    },
    Recommend {
        #[serde(default)]
        profile: UserProfile,
    },
    Reset,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Question {
        index: usize,
        total: usize,
        question: String,
        options: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
    AnswerResult {
        correct: bool,
        #[serde(rename = "correctAnswer")]
        correct_answer: String,
        score: u32,
    },
    Results {
        score: u32,
        total: usize,
    },
    Hint {
        text: String,
    },
    AiReply {
        text: String,
    },
    Topics {
        topics: Vec<String>,
    },
    Reset,
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
pub struct AssistantIn {
    #[serde(default)]
    pub mode: AssistantMode,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "selectedAnswer", default)]
    pub selected_answer: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub language: Option<Language>,
}
#[derive(Debug, Serialize)]
pub struct AssistantOut {
    pub message: String,
}

/// Body of `/api/generate-quiz`, `/api/custome-quiz` and `/api/gradio-quiz`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct QuizIn {
    #[serde(rename = "quizTopic", default, deserialize_with = "de_opt_text")]
    pub quiz_topic: Option<String>,
    #[serde(rename = "numberOfQuestions", default, deserialize_with = "de_opt_count")]
    pub number_of_questions: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub model: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TriviaIn {
    #[serde(default, deserialize_with = "de_opt_text")]
    pub category: Option<String>,
    #[serde(rename = "numQuestions", default, deserialize_with = "de_opt_count")]
    pub num_questions: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuizOut {
    pub quiz: Vec<QuizItem>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "de_opt_text")]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
}
#[derive(Debug, Serialize)]
pub struct TopicsOut {
    pub topics: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
