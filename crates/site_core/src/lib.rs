pub mod domain;
pub mod ports;

pub use domain::{
    decode_document, document_email, document_file_urls, keys, status, Article, ChatLog, ChatTurn,
    Feedback, Permission, Questionnaire, Submission, User,
};
pub use ports::{AssistantService, BlobStore, ChatStream, KvStore, PortError, PortResult};
