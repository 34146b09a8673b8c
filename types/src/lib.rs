pub mod audio;
pub mod phrases;
pub mod question;
pub mod session;
pub mod validation;

pub use audio::{Base64EncodedAudioBytes, Utterance};
pub use phrases::AudioPhrases;
pub use question::Question;
pub use session::{
    ChargeTokensRequest, ChargeTokensResponse, FinalizeSessionRequest, FinalizeSessionResponse,
    GenerateSessionResponse, SessionCriteria,
};
pub use validation::{ValidateAnswerRequest, ValidateAnswerResponse};
