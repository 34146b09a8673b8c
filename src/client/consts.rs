pub const INTERVIEW_API_URL: &str = "INTERVIEW_API_URL";
pub const INTERVIEW_API_KEY: &str = "INTERVIEW_API_KEY";

pub const BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

pub const GENERATE_SESSION_PATH: &str = "sessions";
pub const AUDIO_PHRASES_PATH: &str = "audio-phrases";
pub const VALIDATE_ANSWER_PATH: &str = "answers/validate";
pub const FINALIZE_SESSION_PATH: &str = "sessions/finalize";
pub const CHARGE_TOKENS_PATH: &str = "tokens/charge";
