use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use log::info;

use crate::history::{ format_history_for_prompt, window_slice };
use crate::models::chat::ChatMessage;

pub const CAREER_PLACEHOLDER: &str = "{career}";

pub const SYSTEM_PROMPT: &str = "You are a career guidance assistant. Provide ONLY precise, bullet-point responses.

STRICT RULES:
1. ALWAYS respond in bullet points (• format)
2. MAXIMUM 100 words per response
3. Be extremely concise - no fluff or filler words
4. Focus only on essential information
5. Use clear, direct language
6. Skip introductions and conclusions
7. Prioritize actionable information
8. For career guides: Use • Job • Education • Skills • Salary • Certifications • Next steps
9. For exams: Use • Exam names • Eligibility • Pattern • Preparation • Benefits
10. NEVER write paragraphs - only bullet points

Response format examples:
• Job: Brief description (1 sentence)
• Education: Main requirements
• Skills: Top 3-5 essential skills
• Salary: Approximate range
• Certifications: Key ones only
• Next steps: 2-3 immediate actions

Enforce word limits strictly. Be direct and to the point.";

pub const GUIDE_TEMPLATE: &str = "Create a concise career guide for {career}. Provide only bullet points:
• Job description: 1-2 sentences
• Education: main qualifications needed
• Skills: top 3-5 essential skills
• Career path: key progression steps
• Salary: approximate range
• Certifications: most important ones
• Getting started: 2-3 immediate actions

Format strictly as bullet points. Maximum 100 words. Be precise and to the point.";

pub const EXAM_TEMPLATE: &str = "I want to pursue {career}. Recommend key exams and certifications in bullet points:
• Exams: top 3-5 entrance/competitive exams
• Eligibility: main requirements only
• Pattern: exam format overview
• Preparation: most effective resources
• Benefits: career impact summary

Format strictly as bullet points. Maximum 80 words. Be precise and to the point.";

#[derive(Debug)]
pub enum PromptError {
    PlaceholderMissing(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::PlaceholderMissing(key) =>
                write!(f, "Prompt template '{}' has no {} placeholder", key, CAREER_PLACEHOLDER),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// Instructional preamble and request templates. Fields missing from a
/// prompts file keep their built-in values.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub guide_template: String,
    pub exam_template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            guide_template: GUIDE_TEMPLATE.to_string(),
            exam_template: EXAM_TEMPLATE.to_string(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if !self.guide_template.contains(CAREER_PLACEHOLDER) {
            return Err(PromptError::PlaceholderMissing("guide_template".to_string()));
        }
        if !self.exam_template.contains(CAREER_PLACEHOLDER) {
            return Err(PromptError::PlaceholderMissing("exam_template".to_string()));
        }
        Ok(())
    }

    pub fn guide_request(&self, career: &str) -> String {
        self.guide_template.replace(CAREER_PLACEHOLDER, career)
    }

    pub fn exam_request(&self, career: &str) -> String {
        self.exam_template.replace(CAREER_PLACEHOLDER, career)
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let file_content = fs::read_to_string(&path)?;
    let config: PromptConfig = serde_json::from_str(&file_content)?;
    config.validate()?;
    info!("Loaded prompts from {}", path.as_ref().display());
    Ok(Arc::new(config))
}

/// Preamble, the last `window` turns of `history`, the new user turn, and an
/// open assistant turn for the model to complete.
pub fn build_chat_prompt(
    config: &PromptConfig,
    history: &[ChatMessage],
    window: usize,
    message: &str
) -> String {
    let mut prompt = format!("{}\n\n", config.system_prompt);
    prompt.push_str(&format_history_for_prompt(window_slice(history, window)));
    prompt.push_str(&format!("user: {}\n", message));
    prompt.push_str("assistant: ");
    prompt
}

pub fn build_guide_prompt(config: &PromptConfig, career: &str) -> String {
    format!("{}\n\n{}", config.system_prompt, config.guide_request(career))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn chat_prompt_keeps_last_five_turns() {
        let config = PromptConfig {
            system_prompt: "PREAMBLE".to_string(),
            ..PromptConfig::default()
        };
        let history: Vec<ChatMessage> = (0..7)
            .map(|i| if i % 2 == 0 {
                ChatMessage::user(format!("q{}", i))
            } else {
                ChatMessage::assistant(format!("a{}", i))
            })
            .collect();

        let prompt = build_chat_prompt(&config, &history, 5, "What next?");
        assert_eq!(
            prompt,
            "PREAMBLE\n\nuser: q2\nassistant: a3\nuser: q4\nassistant: a5\nuser: q6\nuser: What next?\nassistant: "
        );
    }

    #[test]
    fn chat_prompt_without_history() {
        let config = PromptConfig::default();
        let prompt = build_chat_prompt(&config, &[], 5, "Hi");
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.ends_with("\n\nuser: Hi\nassistant: "));
    }

    #[test]
    fn guide_prompt_names_career() {
        let prompt = build_guide_prompt(&PromptConfig::default(), "Data Scientist");
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("Create a concise career guide for Data Scientist."));
    }

    #[test]
    fn prompts_file_overrides_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"system_prompt": "Be brief."}}"#).unwrap();
        let config = load_prompts(file.path()).unwrap();
        assert_eq!(config.system_prompt, "Be brief.");
        assert_eq!(config.guide_template, GUIDE_TEMPLATE);
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"exam_template": "Recommend exams."}}"#).unwrap();
        match load_prompts(file.path()) {
            Err(PromptError::PlaceholderMissing(key)) => assert_eq!(key, "exam_template"),
            other => panic!("expected missing placeholder, got {:?}", other.map(|_| ())),
        }
    }
}
