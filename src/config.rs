use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;
use log::{info, warn};

pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20241022-v2:0";
pub const DEFAULT_MODEL_LABEL: &str = "claude-3-5-sonnet-v2";
pub const DEFAULT_REGION: &str = "us-east-1";

// Used whenever the persona asset is missing or blank
pub const FALLBACK_SYSTEM_PROMPT: &str = r#"You are an expert Y Combinator application coach with deep experience helping startups get accepted. Your specific task is to help entrepreneurs perfect their answer to: "What is your company going to make? Please describe your product and what it does or will do."

COACHING METHODOLOGY:
1. **Problem Clarity**: Ensure they clearly articulate the specific problem
2. **Solution Specificity**: Help them explain their solution concretely
3. **Target Market**: Guide them to identify their exact customer
4. **Differentiation**: Help them explain what makes their approach unique
5. **Traction Indicators**: Encourage mention of early validation/progress

SUCCESSFUL YC ANSWERS TYPICALLY:
- Start with a relatable, specific problem statement
- Explain the solution in simple, jargon-free language
- Identify a clear target market (not "everyone")
- Show understanding of existing alternatives
- Demonstrate early traction or validation
- Are concise but comprehensive (2-4 sentences ideal)

COACHING STYLE:
- Ask specific, actionable follow-up questions
- Point out vague language and ask for concrete examples
- Be encouraging but direct about areas needing improvement
- Help them iterate toward a compelling, clear answer
- Reference what makes YC applications successful

Focus on one key improvement area per response. Ask specific questions that lead to better clarity."#;

/// Generation settings and identity of the hosted model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_id: String,
    /// Reported back to callers as `model_used`.
    pub model_label: String,
    pub region: String,
    pub max_tokens: i32,
    pub temperature: f64,
    pub top_p: f64,
    pub stop_sequences: Vec<String>,
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            model_label: DEFAULT_MODEL_LABEL.to_string(),
            region: DEFAULT_REGION.to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 0.9,
            stop_sequences: vec!["Human:".to_string(), "Assistant:".to_string()],
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub static_dir: String,
}

/// Process-wide configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub system_prompt: String,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = ModelConfig::default();

        let model = ModelConfig {
            model_id: env::var("MODEL_ID").unwrap_or(defaults.model_id),
            model_label: env::var("MODEL_LABEL").unwrap_or(defaults.model_label),
            region: env::var("AWS_REGION").unwrap_or(defaults.region),
            max_tokens: parse_env("MAX_TOKENS", defaults.max_tokens),
            temperature: parse_env("TEMPERATURE", defaults.temperature),
            top_p: parse_env("TOP_P", defaults.top_p),
            stop_sequences: defaults.stop_sequences,
            timeout: Duration::from_secs(parse_env("MODEL_TIMEOUT_SECS", 30u64)),
        };

        let server = ServerConfig {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_env("PORT", 8080u16),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
        };

        let prompt_path = env::var("SYSTEM_PROMPT_PATH")
            .unwrap_or_else(|_| "system_prompt.txt".to_string());

        Self {
            server,
            model,
            system_prompt: load_system_prompt(&prompt_path),
        }
    }
}

/// Reads the persona asset, falling back to the built-in coaching prompt.
pub fn load_system_prompt(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            info!("Loaded system prompt from {} ({} bytes)", path, text.len());
            text.trim().to_string()
        }
        Ok(_) => {
            warn!("System prompt at {} is empty, using built-in prompt", path);
            FALLBACK_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            warn!("Could not read system prompt at {}: {}. Using built-in prompt", path, e);
            FALLBACK_SYSTEM_PROMPT.to_string()
        }
    }
}

fn parse_env<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_prompt_file_uses_fallback() {
        let prompt = load_system_prompt("/nonexistent/system_prompt.txt");
        assert_eq!(prompt, FALLBACK_SYSTEM_PROMPT);
    }

    #[test]
    fn prompt_file_is_trimmed() {
        let path = env::temp_dir().join(format!("prompt-{}.txt", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "  You are a terse coach.  \n").unwrap();

        let prompt = load_system_prompt(path.to_str().unwrap());
        assert_eq!(prompt, "You are a terse coach.");

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn blank_prompt_file_uses_fallback() {
        let path = env::temp_dir().join(format!("prompt-{}.txt", uuid::Uuid::new_v4()));
        fs::write(&path, "   \n\n").unwrap();

        assert_eq!(load_system_prompt(path.to_str().unwrap()), FALLBACK_SYSTEM_PROMPT);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        env::set_var("YC_COACH_TEST_BAD_NUMBER", "not-a-number");
        assert_eq!(parse_env("YC_COACH_TEST_BAD_NUMBER", 42u16), 42);

        env::set_var("YC_COACH_TEST_GOOD_NUMBER", " 0.25 ");
        assert_eq!(parse_env("YC_COACH_TEST_GOOD_NUMBER", 0.7f64), 0.25);
    }

    #[test]
    fn default_generation_settings() {
        let model = ModelConfig::default();
        assert_eq!(model.max_tokens, 1000);
        assert_eq!(model.temperature, 0.7);
        assert_eq!(model.top_p, 0.9);
        assert_eq!(model.timeout, Duration::from_secs(30));
    }
}
