mod openai;

pub use openai::OpenAiChatOracle;
